//! Core types shared by the squish size optimizer crates.

pub mod config;
pub mod error;
pub mod stats;

pub use config::*;
pub use error::{Error, Result};
pub use stats::*;
