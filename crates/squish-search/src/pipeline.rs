//! Fixed-depth evaluation pipeline.
//!
//! Candidates are consumed strictly in submission order, so a run is
//! reproducible for a given seed, depth and worker count, and inline and
//! pooled execution agree for the same depth.

use crate::cancel::CancelToken;
use crate::cost::CostFunction;
use crate::streams::partition;
use crate::worker::{mutate_and_evaluate, Candidate, Reply, WorkItem};
use rand_chacha::ChaCha8Rng;
use rayon::{ThreadPool, ThreadPoolBuilder};
use squish_ast::{Mutator, State};
use squish_core::{Error, PipelineConfig, Result};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

enum Pending<F> {
    /// Evaluated in the caller's thread when dequeued
    Deferred {
        state: State,
        rng: ChaCha8Rng,
        skip_mutation: bool,
    },
    InFlight(Receiver<Reply<F>>),
}

pub struct Pipeline<C: CostFunction> {
    cost: Arc<C>,
    mutator: Arc<Mutator>,
    cancel: CancelToken,
    pending: VecDeque<Pending<C::Finisher>>,
    pool: Option<ThreadPool>,
    timeout_secs: u64,
}

impl<C: CostFunction> Pipeline<C> {
    /// Fills the pipeline with `queue_length` items derived from `initial`,
    /// each with its own stream. The first item is the unmutated baseline.
    pub fn start(
        initial: &State,
        cost: C,
        mutator: Mutator,
        config: &PipelineConfig,
        seed: u64,
        cancel: &CancelToken,
    ) -> Result<Self> {
        if config.queue_length == 0 || config.workers == 0 {
            return Err(Error::InvalidConfig(
                "pipeline needs a depth and at least one worker".to_string(),
            ));
        }

        let pool = if config.workers > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("squish-worker-{i}"))
                .build()
                .map_err(|e| Error::InvalidConfig(format!("cannot start worker pool: {e}")))?;
            Some(pool)
        } else {
            None
        };

        let mut pipeline = Self {
            cost: Arc::new(cost),
            mutator: Arc::new(mutator),
            cancel: cancel.child(),
            pending: VecDeque::with_capacity(config.queue_length),
            pool,
            timeout_secs: config.result_timeout_secs,
        };

        for (i, rng) in partition(seed, config.queue_length).into_iter().enumerate() {
            pipeline.submit(initial, rng, i == 0)?;
        }

        debug!(
            depth = config.queue_length,
            workers = config.workers,
            "evaluation pipeline started"
        );
        Ok(pipeline)
    }

    /// Number of items in flight
    pub fn depth(&self) -> usize {
        self.pending.len()
    }

    /// Takes the oldest result and refills its slot with a mutation of
    /// `current`, using the stream the result came back with.
    pub fn next(&mut self, current: &State) -> Result<Candidate<C::Finisher>> {
        self.cancel.check()?;
        let pending = self
            .pending
            .pop_front()
            .ok_or_else(|| Error::InvalidState("evaluation pipeline is empty".to_string()))?;
        let candidate = self.resolve(pending)?;
        self.submit(current, candidate.rng.clone(), false)?;
        Ok(candidate)
    }

    fn submit(&mut self, state: &State, rng: ChaCha8Rng, skip_mutation: bool) -> Result<()> {
        let Some(pool) = &self.pool else {
            self.pending.push_back(Pending::Deferred {
                state: state.clone(),
                rng,
                skip_mutation,
            });
            return Ok(());
        };

        let item = WorkItem::new(state, &rng, skip_mutation)?;
        let (tx, rx) = mpsc::channel();
        let cost = Arc::clone(&self.cost);
        let mutator = Arc::clone(&self.mutator);
        let cancel = self.cancel.clone();
        pool.spawn(move || {
            let reply = item.execute(mutator.as_ref(), cost.as_ref(), &cancel);
            // the receiver is gone once the pipeline has been dropped
            let _ = tx.send(reply);
        });
        self.pending.push_back(Pending::InFlight(rx));
        Ok(())
    }

    fn resolve(&self, pending: Pending<C::Finisher>) -> Result<Candidate<C::Finisher>> {
        match pending {
            Pending::Deferred {
                state,
                rng,
                skip_mutation,
            } => mutate_and_evaluate(
                &state,
                rng,
                skip_mutation,
                &self.mutator,
                self.cost.as_ref(),
                &self.cancel,
            ),
            Pending::InFlight(rx) => {
                match rx.recv_timeout(Duration::from_secs(self.timeout_secs)) {
                    Ok(Reply::Done(output)) => output.into_candidate(),
                    Ok(Reply::Cancelled) => Err(Error::Cancelled),
                    Ok(Reply::Failed(msg)) => Err(Error::Evaluation(msg)),
                    Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(self.timeout_secs)),
                    Err(RecvTimeoutError::Disconnected) => Err(Error::WorkerLost),
                }
            }
        }
    }
}

impl<C: CostFunction> Drop for Pipeline<C> {
    fn drop(&mut self) {
        // stops queued work; the caller's token is left alone
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CommitBytes, Evaluation, RenderedLength};
    use squish_ast::parse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn initial() -> State {
        State::new(parse("x=1+2 y=a*b").unwrap())
    }

    fn config(queue_length: usize, workers: usize) -> PipelineConfig {
        PipelineConfig {
            queue_length,
            workers,
            ..PipelineConfig::default()
        }
    }

    fn costs(queue_length: usize, workers: usize, rounds: usize) -> Vec<(String, f64)> {
        let mut pipeline = Pipeline::start(
            &initial(),
            RenderedLength::default(),
            Mutator::default(),
            &config(queue_length, workers),
            3,
            &CancelToken::new(),
        )
        .unwrap();
        let mut current = initial();
        let mut seen = Vec::new();
        for _ in 0..rounds {
            let candidate = pipeline.next(&current).unwrap();
            seen.push((String::from_utf8(candidate.finisher.0).unwrap(), candidate.cost));
            current = candidate.state;
        }
        seen
    }

    #[test]
    fn test_first_result_is_baseline() {
        for (depth, workers) in [(1, 1), (4, 1), (4, 3)] {
            let seen = costs(depth, workers, 1);
            assert_eq!(seen[0], ("x=1+2y=a*b".to_string(), 10.0));
        }
    }

    #[test]
    fn test_inline_and_pool_agree() {
        assert_eq!(costs(1, 1, 20), costs(1, 2, 20));
        assert_eq!(costs(4, 1, 20), costs(4, 4, 20));
    }

    #[test]
    fn test_depth_is_kept() {
        let mut pipeline = Pipeline::start(
            &initial(),
            RenderedLength::default(),
            Mutator::default(),
            &config(5, 1),
            0,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(pipeline.depth(), 5);
        pipeline.next(&initial()).unwrap();
        assert_eq!(pipeline.depth(), 5);
    }

    struct Counting(Arc<AtomicUsize>);

    impl CostFunction for Counting {
        type Finisher = CommitBytes;

        fn evaluate(&self, _state: &State) -> Result<Evaluation<CommitBytes>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Evaluation::new(0.0, CommitBytes(Vec::new())))
        }
    }

    #[test]
    fn test_inline_evaluates_lazily() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::start(
            &initial(),
            Counting(Arc::clone(&count)),
            Mutator::default(),
            &config(3, 1),
            0,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        pipeline.next(&initial()).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancelled_pipeline() {
        let cancel = CancelToken::new();
        for workers in [1, 2] {
            let mut pipeline = Pipeline::start(
                &initial(),
                RenderedLength::default(),
                Mutator::default(),
                &config(2, workers),
                0,
                &cancel,
            )
            .unwrap();
            pipeline.next(&initial()).unwrap();
            cancel.cancel();
            assert!(matches!(pipeline.next(&initial()), Err(Error::Cancelled)));
        }
    }

    struct Failing;

    impl CostFunction for Failing {
        type Finisher = CommitBytes;

        fn evaluate(&self, _state: &State) -> Result<Evaluation<CommitBytes>> {
            Err(Error::Evaluation("no compressor".to_string()))
        }
    }

    #[test]
    fn test_failures_reach_the_consumer() {
        let mut inline = Pipeline::start(
            &initial(),
            Failing,
            Mutator::default(),
            &config(1, 1),
            0,
            &CancelToken::new(),
        )
        .unwrap();
        let err = inline.next(&initial()).err().unwrap();
        assert_eq!(err.to_string(), "Evaluation failed: no compressor");

        let mut pooled = Pipeline::start(
            &initial(),
            Failing,
            Mutator::default(),
            &config(1, 2),
            0,
            &CancelToken::new(),
        )
        .unwrap();
        let err = pooled.next(&initial()).err().unwrap();
        assert!(matches!(err, Error::Evaluation(msg) if msg.contains("no compressor")));
    }

    #[test]
    fn test_drop_leaves_caller_token() {
        let cancel = CancelToken::new();
        let pipeline = Pipeline::start(
            &initial(),
            RenderedLength::default(),
            Mutator::default(),
            &config(2, 2),
            0,
            &cancel,
        )
        .unwrap();
        drop(pipeline);
        assert!(!cancel.is_cancelled());
    }
}
