//! Stochastic local search over Lua syntax trees.
//!
//! A [`Pipeline`] keeps a fixed number of mutate-and-evaluate items in
//! flight, inline or on a worker pool, and an [`Acceptance`] rule decides
//! which candidates replace the current state.

pub mod algorithms;
pub mod cancel;
pub mod cost;
pub mod pipeline;
pub mod runner;
pub mod streams;
pub mod worker;

pub use algorithms::{Acceptance, Anneal, Dlas, Lahc, SearchOutcome};
pub use cancel::CancelToken;
pub use cost::{
    commit, commit_with, BestObserver, CommitBytes, CostFunction, Evaluation, Finisher,
    IgnoreBest, RenderedLength,
};
pub use pipeline::Pipeline;
pub use runner::{optimize, optimize_with};
pub use worker::Candidate;
