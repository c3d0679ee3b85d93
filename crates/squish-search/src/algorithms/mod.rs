//! Acceptance algorithms and the loop they share.

mod anneal;
mod dlas;
mod lahc;

pub use anneal::Anneal;
pub use dlas::Dlas;
pub use lahc::Lahc;

use crate::cost::{BestObserver, CostFunction};
use crate::pipeline::Pipeline;
use squish_ast::State;
use squish_core::{Result, SearchStats};
use tracing::{debug, trace, warn};

/// Decides whether a candidate replaces the current state.
///
/// Costs are compared, never states. Implementations hold their own
/// history and randomness; they run on the consuming thread only.
pub trait Acceptance {
    /// Called once with the baseline cost and the step budget (0 when
    /// unbounded).
    fn start(&mut self, baseline: f64, steps: usize);

    fn accept(&mut self, step: usize, candidate: f64, current: f64) -> bool;

    /// Called after every decision with the current cost before and after.
    fn update(&mut self, _step: usize, _current: f64, _previous: f64) {}
}

/// Result of a search run
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: State,
    pub best_cost: f64,
    pub stats: SearchStats,
    /// Whether the run stopped on the cancel token before its budget
    pub cancelled: bool,
}

/// Runs `acceptance` over candidates drawn from `pipeline`.
///
/// The observer sees the baseline and every later strict improvement, in
/// order. Cancellation ends the run with the best so far; any other error
/// aborts it.
pub fn run<C, A, O>(
    pipeline: &mut Pipeline<C>,
    initial: &State,
    steps: usize,
    acceptance: &mut A,
    observer: &mut O,
) -> Result<SearchOutcome>
where
    C: CostFunction,
    A: Acceptance + ?Sized,
    O: BestObserver<C::Finisher> + ?Sized,
{
    let mut stats = SearchStats::new();

    let baseline = pipeline.next(initial)?;
    let mut current = baseline.state;
    let mut current_cost = baseline.cost;
    let mut best = current.clone();
    let mut best_cost = current_cost;
    stats.record_best(best_cost);
    observer.on_new_best(&best, best_cost, baseline.finisher)?;
    debug!(cost = best_cost, "baseline evaluated");

    acceptance.start(current_cost, steps);

    let mut cancelled = false;
    let mut step = 0;
    while best_cost > 0.0 && (steps == 0 || step < steps) {
        let candidate = match pipeline.next(&current) {
            Ok(candidate) => candidate,
            Err(err) if err.is_cancelled() => {
                warn!(step, best_cost, "search cancelled");
                cancelled = true;
                break;
            }
            Err(err) => return Err(err),
        };

        let accepted = acceptance.accept(step, candidate.cost, current_cost);
        trace!(step, cost = candidate.cost, accepted, "candidate");
        stats.record_step(accepted);

        if candidate.cost < best_cost {
            best_cost = candidate.cost;
            best = candidate.state.clone();
            stats.record_best(best_cost);
            observer.on_new_best(&best, best_cost, candidate.finisher)?;
            debug!(step, cost = best_cost, "new best");
        }

        let previous = current_cost;
        if accepted {
            current = candidate.state;
            current_cost = candidate.cost;
        }
        acceptance.update(step, current_cost, previous);
        step += 1;
    }

    Ok(SearchOutcome {
        best,
        best_cost,
        stats,
        cancelled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::cost::{CommitBytes, IgnoreBest, RenderedLength};
    use squish_ast::{parse, Mutator};
    use squish_core::{Error, PipelineConfig};

    /// Accepts everything and records the calls it gets
    #[derive(Default)]
    struct Greedy {
        started: Option<(f64, usize)>,
        updates: usize,
    }

    impl Acceptance for Greedy {
        fn start(&mut self, baseline: f64, steps: usize) {
            self.started = Some((baseline, steps));
        }

        fn accept(&mut self, _step: usize, _candidate: f64, _current: f64) -> bool {
            true
        }

        fn update(&mut self, _step: usize, _current: f64, _previous: f64) {
            self.updates += 1;
        }
    }

    fn pipeline(initial: &State) -> Pipeline<RenderedLength> {
        Pipeline::start(
            initial,
            RenderedLength::default(),
            Mutator::default(),
            &PipelineConfig::default(),
            0,
            &CancelToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_runs_the_step_budget() {
        let initial = State::new(parse("x=a+b*c").unwrap());
        let mut greedy = Greedy::default();
        let outcome = run(&mut pipeline(&initial), &initial, 25, &mut greedy, &mut IgnoreBest).unwrap();
        assert_eq!(greedy.started, Some((7.0, 25)));
        assert_eq!(greedy.updates, 25);
        assert_eq!(outcome.stats.steps, 25);
        assert_eq!(outcome.stats.accepted, 25);
        assert!(!outcome.cancelled);
        assert!(outcome.best_cost <= 7.0);
    }

    #[test]
    fn test_observer_sees_strict_improvements() {
        let initial = State::new(parse("x=1+2 y=2*3").unwrap());
        let mut seen = Vec::new();
        let mut observer = |_: &State, cost: f64, finisher: CommitBytes| -> Result<()> {
            assert_eq!(finisher.0.len() as f64, cost);
            seen.push(cost);
            Ok(())
        };
        let outcome = run(
            &mut pipeline(&initial),
            &initial,
            200,
            &mut Greedy::default(),
            &mut observer,
        )
        .unwrap();
        assert_eq!(seen[0], 10.0);
        assert!(seen.windows(2).all(|w| w[1] < w[0]));
        assert_eq!(*seen.last().unwrap(), outcome.best_cost);
        assert_eq!(outcome.stats.improvements as usize, seen.len() - 1);
    }

    #[test]
    fn test_empty_program_stops_at_once() {
        let initial = State::new(parse("").unwrap());
        let mut greedy = Greedy::default();
        let outcome = run(&mut pipeline(&initial), &initial, 100, &mut greedy, &mut IgnoreBest).unwrap();
        assert_eq!(outcome.best_cost, 0.0);
        assert_eq!(outcome.stats.steps, 0);
    }

    #[test]
    fn test_observer_errors_abort() {
        let initial = State::new(parse("x=1").unwrap());
        let mut observer = |_: &State, _: f64, _: CommitBytes| -> Result<()> {
            Err(Error::Evaluation("disk full".to_string()))
        };
        let result = run(
            &mut pipeline(&initial),
            &initial,
            10,
            &mut Greedy::default(),
            &mut observer,
        );
        assert!(matches!(result, Err(Error::Evaluation(_))));
    }
}
