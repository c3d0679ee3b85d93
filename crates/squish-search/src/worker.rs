//! Mutate-and-evaluate work items.

use crate::cancel::CancelToken;
use crate::cost::CostFunction;
use crate::streams::{rng_from_bytes, rng_to_bytes};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use squish_ast::{Mutator, State};
use squish_core::{Error, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// A candidate ready for the acceptance rule
pub struct Candidate<F> {
    pub state: State,
    pub cost: f64,
    /// Stream position after the mutation, for the next item of the slot
    pub rng: ChaCha8Rng,
    pub finisher: F,
}

/// Clones `state`, mutates the clone unless `skip_mutation`, and evaluates
/// it. The token is checked before each of the two steps.
pub fn mutate_and_evaluate<C: CostFunction>(
    state: &State,
    mut rng: ChaCha8Rng,
    skip_mutation: bool,
    mutator: &Mutator,
    cost: &C,
    cancel: &CancelToken,
) -> Result<Candidate<C::Finisher>> {
    cancel.check()?;
    let state = if skip_mutation {
        state.clone()
    } else {
        mutator.mutate(state, &mut rng)?
    };
    cancel.check()?;
    let evaluation = cost.evaluate(&state)?;
    Ok(Candidate {
        state,
        cost: evaluation.cost,
        rng,
        finisher: evaluation.finisher,
    })
}

/// Work item as handed to a pool thread: state and stream travel as
/// snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub skip_mutation: bool,
    pub state: Vec<u8>,
    pub rng: Vec<u8>,
}

/// Completed work as returned by a pool thread
pub struct WorkOutput<F> {
    pub state: Vec<u8>,
    pub cost: f64,
    pub rng: Vec<u8>,
    pub finisher: F,
}

impl<F> WorkOutput<F> {
    pub fn into_candidate(self) -> Result<Candidate<F>> {
        Ok(Candidate {
            state: State::from_bytes(&self.state)?,
            cost: self.cost,
            rng: rng_from_bytes(&self.rng)?,
            finisher: self.finisher,
        })
    }
}

/// Reply sent back over a worker's channel
pub enum Reply<F> {
    Done(WorkOutput<F>),
    /// The token was set before the work finished
    Cancelled,
    /// Mutation or evaluation failed or panicked
    Failed(String),
}

impl WorkItem {
    pub fn new(state: &State, rng: &ChaCha8Rng, skip_mutation: bool) -> Result<Self> {
        Ok(Self {
            skip_mutation,
            state: state.to_bytes()?,
            rng: rng_to_bytes(rng)?,
        })
    }

    /// Executes this item; never panics.
    pub fn execute<C: CostFunction>(
        self,
        mutator: &Mutator,
        cost: &C,
        cancel: &CancelToken,
    ) -> Reply<C::Finisher> {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run(mutator, cost, cancel)));
        match outcome {
            Ok(Ok(output)) => Reply::Done(output),
            Ok(Err(Error::Cancelled)) => Reply::Cancelled,
            Ok(Err(err)) => Reply::Failed(err.to_string()),
            Err(panic) => Reply::Failed(panic_message(panic.as_ref())),
        }
    }

    fn run<C: CostFunction>(
        &self,
        mutator: &Mutator,
        cost: &C,
        cancel: &CancelToken,
    ) -> Result<WorkOutput<C::Finisher>> {
        let state = State::from_bytes(&self.state)?;
        let rng = rng_from_bytes(&self.rng)?;
        let candidate = mutate_and_evaluate(&state, rng, self.skip_mutation, mutator, cost, cancel)?;
        Ok(WorkOutput {
            state: candidate.state.to_bytes()?,
            cost: candidate.cost,
            rng: rng_to_bytes(&candidate.rng)?,
            finisher: candidate.finisher,
        })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("worker panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("worker panicked: {msg}")
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CommitBytes, Evaluation, RenderedLength};
    use crate::streams::partition;
    use squish_ast::{parse, Node};

    struct Panicking;

    impl CostFunction for Panicking {
        type Finisher = CommitBytes;

        fn evaluate(&self, _state: &State) -> Result<Evaluation<CommitBytes>> {
            panic!("cost exploded");
        }
    }

    fn sample() -> State {
        State::new(parse("x=1+2").unwrap())
    }

    #[test]
    fn test_baseline_skips_mutation() {
        let rng = partition(0, 1).remove(0);
        let candidate = mutate_and_evaluate(
            &sample(),
            rng,
            true,
            &Mutator::default(),
            &RenderedLength::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(candidate.state, sample());
        assert_eq!(candidate.cost, 5.0);
    }

    #[test]
    fn test_pooled_item_matches_inline() {
        let rng = partition(5, 1).remove(0);
        let mutator = Mutator::default();
        let cost = RenderedLength::default();
        let cancel = CancelToken::new();

        let inline = mutate_and_evaluate(&sample(), rng.clone(), false, &mutator, &cost, &cancel)
            .unwrap();
        let item = WorkItem::new(&sample(), &rng, false).unwrap();
        let Reply::Done(output) = item.execute(&mutator, &cost, &cancel) else {
            panic!("expected a result");
        };
        let pooled = output.into_candidate().unwrap();
        assert_eq!(pooled.state, inline.state);
        assert_eq!(pooled.cost, inline.cost);
        assert_eq!(pooled.finisher.0, inline.finisher.0);
    }

    #[test]
    fn test_cancelled_item() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let rng = partition(0, 1).remove(0);
        let item = WorkItem::new(&sample(), &rng, false).unwrap();
        let reply = item.execute(&Mutator::default(), &RenderedLength::default(), &cancel);
        assert!(matches!(reply, Reply::Cancelled));
    }

    #[test]
    fn test_panic_becomes_failure() {
        let rng = partition(0, 1).remove(0);
        let item = WorkItem::new(&State::new(Node::chunk(vec![])), &rng, true).unwrap();
        match item.execute(&Mutator::default(), &Panicking, &CancelToken::new()) {
            Reply::Failed(msg) => assert!(msg.contains("cost exploded")),
            _ => panic!("expected a failure"),
        }
    }
}
