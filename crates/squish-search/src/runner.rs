//! Entry points that wire a configuration to an algorithm.

use crate::algorithms::{self, Acceptance, Anneal, Dlas, Lahc, SearchOutcome};
use crate::cancel::CancelToken;
use crate::cost::{BestObserver, CostFunction};
use crate::pipeline::Pipeline;
use squish_ast::{Mutator, State};
use squish_core::{Algorithm, Result, SearchConfig};
use tracing::{debug, info, instrument};

/// Searches for a smaller form of `initial` with the default mutation
/// catalogue.
pub fn optimize<C, O>(
    initial: &State,
    cost: C,
    config: &SearchConfig,
    observer: &mut O,
    cancel: &CancelToken,
) -> Result<SearchOutcome>
where
    C: CostFunction,
    O: BestObserver<C::Finisher> + ?Sized,
{
    optimize_with(initial, cost, Mutator::default(), config, observer, cancel)
}

#[instrument(
    skip_all,
    fields(algorithm = %config.algorithm, steps = config.steps, seed = config.seed)
)]
pub fn optimize_with<C, O>(
    initial: &State,
    cost: C,
    mutator: Mutator,
    config: &SearchConfig,
    observer: &mut O,
    cancel: &CancelToken,
) -> Result<SearchOutcome>
where
    C: CostFunction,
    O: BestObserver<C::Finisher> + ?Sized,
{
    config.validate()?;

    let mut acceptance: Box<dyn Acceptance> = match config.algorithm {
        Algorithm::Anneal => Box::new(Anneal::new(&config.anneal, config.seed)),
        Algorithm::Lahc => Box::new(Lahc::new(&config.lahc)),
        Algorithm::Dlas => Box::new(Dlas::new(&config.dlas)),
    };

    debug!(
        reorder_sections = mutator.config().reorder_sections,
        workers = config.pipeline.workers,
        queue_length = config.pipeline.queue_length,
        "starting pipeline"
    );
    let mut pipeline = Pipeline::start(initial, cost, mutator, &config.pipeline, config.seed, cancel)?;
    let outcome = algorithms::run(
        &mut pipeline,
        initial,
        config.steps,
        acceptance.as_mut(),
        observer,
    )?;

    info!(
        best_cost = outcome.best_cost,
        steps = outcome.stats.steps,
        improvements = outcome.stats.improvements,
        acceptance_rate = outcome.stats.acceptance_rate(),
        cancelled = outcome.cancelled,
        "search finished"
    );
    Ok(outcome)
}
