use super::Acceptance;
use squish_core::LahcConfig;

/// Late acceptance hill climbing: a candidate is compared against the
/// current cost and against the cost `history_length` steps ago.
pub struct Lahc {
    history_length: usize,
    margin: f64,
    history: Vec<f64>,
}

impl Lahc {
    pub fn new(config: &LahcConfig) -> Self {
        Self {
            history_length: config.history_length.max(1),
            margin: config.margin,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    fn slot(&self, step: usize) -> usize {
        step % self.history.len()
    }
}

impl Acceptance for Lahc {
    fn start(&mut self, baseline: f64, _steps: usize) {
        self.history = vec![baseline + self.margin; self.history_length];
    }

    fn accept(&mut self, step: usize, candidate: f64, current: f64) -> bool {
        candidate < self.history[self.slot(step)] || candidate <= current
    }

    fn update(&mut self, step: usize, current: f64, _previous: f64) {
        let v = self.slot(step);
        if current < self.history[v] {
            self.history[v] = current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lahc(length: usize, margin: f64, baseline: f64) -> Lahc {
        let mut lahc = Lahc::new(&LahcConfig {
            history_length: length,
            margin,
        });
        lahc.start(baseline, 0);
        lahc
    }

    #[test]
    fn test_history_starts_at_baseline_plus_margin() {
        let lahc = lahc(3, 2.0, 10.0);
        assert_eq!(lahc.history(), &[12.0, 12.0, 12.0]);
    }

    #[test]
    fn test_accepts_below_history_or_current() {
        let mut lahc = lahc(2, 2.0, 10.0);
        // worse than current but under the history entry
        assert!(lahc.accept(0, 11.0, 10.0));
        assert!(lahc.accept(0, 10.0, 10.0));
        assert!(!lahc.accept(0, 12.0, 10.0));
    }

    #[test]
    fn test_history_only_decreases() {
        let mut lahc = lahc(2, 0.0, 10.0);
        lahc.update(0, 8.0, 10.0);
        assert_eq!(lahc.history(), &[8.0, 10.0]);
        lahc.update(1, 11.0, 8.0);
        assert_eq!(lahc.history(), &[8.0, 10.0]);
        lahc.update(2, 7.0, 11.0);
        assert_eq!(lahc.history(), &[7.0, 10.0]);
        // slot 1 remembers 10 even though current is now 7
        assert!(lahc.accept(3, 9.0, 7.0));
        assert!(!lahc.accept(2, 9.0, 7.0));
    }
}
