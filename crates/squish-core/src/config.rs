//! Configuration types for a search run.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Acceptance algorithm driving the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Simulated annealing with an exponential temperature schedule
    Anneal,
    /// Late acceptance hill climbing
    Lahc,
    /// Diversified late acceptance search
    #[default]
    Dlas,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Anneal => "anneal",
            Algorithm::Lahc => "lahc",
            Algorithm::Dlas => "dlas",
        };
        f.write_str(name)
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "anneal" => Ok(Algorithm::Anneal),
            "lahc" => Ok(Algorithm::Lahc),
            "dlas" => Ok(Algorithm::Dlas),
            other => Err(Error::InvalidConfig(format!(
                "unknown algorithm '{other}', expected anneal, lahc or dlas"
            ))),
        }
    }
}

/// Simulated annealing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealConfig {
    /// Temperature at the first step, > 0
    pub start_temp: f64,
    /// Temperature at the last step, > 0
    pub end_temp: f64,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            start_temp: 1.0,
            end_temp: 0.1,
        }
    }
}

/// Late acceptance hill climbing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LahcConfig {
    /// Length of the cost history
    pub history_length: usize,
    /// Added to the initial cost when filling the history
    pub margin: f64,
}

impl Default for LahcConfig {
    fn default() -> Self {
        Self {
            history_length: 500,
            margin: 0.0,
        }
    }
}

/// Diversified late acceptance search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DlasConfig {
    /// Length of the cost history
    pub history_length: usize,
    /// Added to the initial cost when filling the history
    pub margin: f64,
}

impl Default for DlasConfig {
    fn default() -> Self {
        Self {
            history_length: 5,
            margin: 0.0,
        }
    }
}

/// Evaluation pipeline parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of candidate evaluations kept in flight
    pub queue_length: usize,
    /// Worker threads; 1 evaluates inline in the calling thread
    pub workers: usize,
    /// How long to wait for the oldest in-flight candidate
    pub result_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_length: 1,
            workers: 1,
            result_timeout_secs: 3600,
        }
    }
}

/// Complete configuration of one search run
///
/// # Examples
///
/// ```
/// use squish_core::{Algorithm, SearchConfig};
///
/// let config = SearchConfig::default()
///     .with_algorithm(Algorithm::Lahc)
///     .with_steps(2000)
///     .with_seed(7)
///     .with_queue_length(4)
///     .with_workers(4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub algorithm: Algorithm,
    /// Step budget; 0 runs until cancelled
    pub steps: usize,
    /// Master seed for every random stream of the run
    pub seed: u64,
    pub anneal: AnnealConfig,
    pub lahc: LahcConfig,
    pub dlas: DlasConfig,
    pub pipeline: PipelineConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            steps: 10_000,
            seed: 0,
            anneal: AnnealConfig::default(),
            lahc: LahcConfig::default(),
            dlas: DlasConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl SearchConfig {
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_temperatures(mut self, start: f64, end: f64) -> Self {
        self.anneal.start_temp = start;
        self.anneal.end_temp = end;
        self
    }

    pub fn with_lahc_history(mut self, length: usize) -> Self {
        self.lahc.history_length = length;
        self
    }

    pub fn with_dlas_history(mut self, length: usize) -> Self {
        self.dlas.history_length = length;
        self
    }

    /// Sets the history margin of both late acceptance algorithms.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.lahc.margin = margin;
        self.dlas.margin = margin;
        self
    }

    pub fn with_queue_length(mut self, queue_length: usize) -> Self {
        self.pipeline.queue_length = queue_length;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.pipeline.workers = workers;
        self
    }

    /// Loads a configuration from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SearchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));

        if !(self.anneal.start_temp > 0.0) {
            return invalid(format!(
                "start_temp must be positive, got {}",
                self.anneal.start_temp
            ));
        }
        if !(self.anneal.end_temp > 0.0) {
            return invalid(format!(
                "end_temp must be positive, got {}",
                self.anneal.end_temp
            ));
        }
        if self.lahc.history_length == 0 {
            return invalid("lahc history_length must be at least 1".into());
        }
        if self.dlas.history_length == 0 {
            return invalid("dlas history_length must be at least 1".into());
        }
        if !self.lahc.margin.is_finite() || !self.dlas.margin.is_finite() {
            return invalid("margin must be finite".into());
        }
        if self.pipeline.queue_length == 0 {
            return invalid("queue_length must be at least 1".into());
        }
        if self.pipeline.workers == 0 {
            return invalid("workers must be at least 1".into());
        }
        if self.pipeline.result_timeout_secs == 0 {
            return invalid("result_timeout_secs must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let config = SearchConfig::default();
        assert_eq!(config.algorithm, Algorithm::Dlas);
        assert_eq!(config.steps, 10_000);
        assert_eq!(config.lahc.history_length, 500);
        assert_eq!(config.dlas.history_length, 5);
        assert_eq!(config.pipeline.queue_length, 1);
        assert_eq!(config.pipeline.workers, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("ANNEAL".parse::<Algorithm>().unwrap(), Algorithm::Anneal);
        assert_eq!("lahc".parse::<Algorithm>().unwrap(), Algorithm::Lahc);
        assert!("tabu".parse::<Algorithm>().is_err());
        assert_eq!(Algorithm::Dlas.to_string(), "dlas");
    }

    #[test]
    fn test_validate_bad_temperature() {
        let config = SearchConfig::default().with_temperatures(0.0, 0.1);
        assert!(config.validate().is_err());

        let config = SearchConfig::default().with_temperatures(1.0, f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_pipeline() {
        assert!(SearchConfig::default().with_queue_length(0).validate().is_err());
        assert!(SearchConfig::default().with_workers(0).validate().is_err());
        assert!(SearchConfig::default()
            .with_queue_length(8)
            .with_workers(4)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = SearchConfig::from_json(
            r#"{"algorithm": "anneal", "steps": 50, "anneal": {"start_temp": 4.0}}"#,
        )
        .unwrap();
        assert_eq!(config.algorithm, Algorithm::Anneal);
        assert_eq!(config.steps, 50);
        assert_eq!(config.anneal.start_temp, 4.0);
        assert_eq!(config.anneal.end_temp, 0.1);
        assert_eq!(config.dlas.history_length, 5);
    }

    #[test]
    fn test_json_rejects_invalid() {
        assert!(SearchConfig::from_json(r#"{"pipeline": {"workers": 0}}"#).is_err());
        assert!(SearchConfig::from_json("not json").is_err());
    }
}
