//! The boundary between the search and whatever measures a candidate.

use squish_ast::{render, RenderOptions, State};
use squish_core::{Error, Result};
use std::io::Write;

/// Deferred commit of one evaluated candidate.
///
/// Only the global best is ever finished. The returned size must equal the
/// size implied by the reported cost.
pub trait Finisher: Send + 'static {
    fn finish(self, sink: &mut dyn Write) -> Result<u64>;
}

impl<F> Finisher for F
where
    F: FnOnce(&mut dyn Write) -> Result<u64> + Send + 'static,
{
    fn finish(self, sink: &mut dyn Write) -> Result<u64> {
        self(sink)
    }
}

/// Finisher that writes bytes prepared during evaluation
#[derive(Debug, Clone)]
pub struct CommitBytes(pub Vec<u8>);

impl Finisher for CommitBytes {
    fn finish(self, sink: &mut dyn Write) -> Result<u64> {
        sink.write_all(&self.0)?;
        sink.flush()?;
        Ok(self.0.len() as u64)
    }
}

/// Measured cost of a candidate and the means to commit it
pub struct Evaluation<F> {
    pub cost: f64,
    pub finisher: F,
}

impl<F> Evaluation<F> {
    pub fn new(cost: f64, finisher: F) -> Self {
        Self { cost, finisher }
    }
}

/// Cost of a candidate; lower is better.
///
/// Evaluated concurrently from worker threads, hence `Sync`.
pub trait CostFunction: Send + Sync + 'static {
    type Finisher: Finisher;

    fn evaluate(&self, state: &State) -> Result<Evaluation<Self::Finisher>>;
}

/// Runs `finisher` and checks the committed size against `cost`.
pub fn commit<F: Finisher>(finisher: F, cost: f64, sink: &mut dyn Write) -> Result<u64> {
    commit_with(finisher, cost, sink, |size| size as f64)
}

/// Like [`commit`], for a cost that `cost_of` derives from the committed
/// size.
pub fn commit_with<F: Finisher>(
    finisher: F,
    cost: f64,
    sink: &mut dyn Write,
    cost_of: impl Fn(u64) -> f64,
) -> Result<u64> {
    let committed = finisher.finish(sink)?;
    if cost_of(committed) != cost {
        return Err(Error::CommitMismatch { cost, committed });
    }
    Ok(committed)
}

/// Notified synchronously by the acceptance loop on every new global best,
/// including the unmutated baseline.
pub trait BestObserver<F> {
    fn on_new_best(&mut self, state: &State, cost: f64, finisher: F) -> Result<()>;
}

impl<F, T> BestObserver<F> for T
where
    T: FnMut(&State, f64, F) -> Result<()>,
{
    fn on_new_best(&mut self, state: &State, cost: f64, finisher: F) -> Result<()> {
        self(state, cost, finisher)
    }
}

/// Observer that discards every finisher
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreBest;

impl<F> BestObserver<F> for IgnoreBest {
    fn on_new_best(&mut self, _state: &State, _cost: f64, _finisher: F) -> Result<()> {
        Ok(())
    }
}

/// Cost equal to the length of the rendered source
#[derive(Debug, Clone, Default)]
pub struct RenderedLength {
    options: RenderOptions,
}

impl RenderedLength {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }
}

impl CostFunction for RenderedLength {
    type Finisher = CommitBytes;

    fn evaluate(&self, state: &State) -> Result<Evaluation<CommitBytes>> {
        let bytes = render(&state.root, self.options).into_bytes();
        Ok(Evaluation::new(bytes.len() as f64, CommitBytes(bytes)))
    }
}
