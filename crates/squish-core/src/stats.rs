//! Progress statistics for a search run.

use serde::{Deserialize, Serialize};

/// Counters collected while an acceptance algorithm runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchStats {
    /// Candidates consumed, excluding the baseline
    pub steps: u64,
    /// Candidates that replaced the current state
    pub accepted: u64,
    /// Candidates that set a new best
    pub improvements: u64,
    /// (step, cost) for every new best, the baseline at step 0
    pub best_trace: Vec<(u64, f64)>,
}

impl SearchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one consumed candidate.
    pub fn record_step(&mut self, accepted: bool) {
        self.steps += 1;
        if accepted {
            self.accepted += 1;
        }
    }

    /// Records a new best cost at the current step.
    pub fn record_best(&mut self, cost: f64) {
        if self.steps > 0 {
            self.improvements += 1;
        }
        self.best_trace.push((self.steps, cost));
    }

    /// Fraction of consumed candidates that were accepted
    pub fn acceptance_rate(&self) -> f64 {
        if self.steps == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.steps as f64
    }

    /// Most recent best cost, if any was recorded
    pub fn best_cost(&self) -> Option<f64> {
        self.best_trace.last().map(|&(_, cost)| cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_steps() {
        let mut stats = SearchStats::new();
        stats.record_best(10.0);
        stats.record_step(true);
        stats.record_step(false);
        stats.record_best(8.0);
        stats.record_step(true);

        assert_eq!(stats.steps, 3);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.improvements, 1);
        assert_eq!(stats.best_trace, vec![(0, 10.0), (2, 8.0)]);
        assert_eq!(stats.best_cost(), Some(8.0));
        assert!((stats.acceptance_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_stats() {
        let stats = SearchStats::new();
        assert_eq!(stats.acceptance_rate(), 0.0);
        assert_eq!(stats.best_cost(), None);
    }
}
