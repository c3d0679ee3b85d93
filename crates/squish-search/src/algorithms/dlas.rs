use super::Acceptance;
use squish_core::DlasConfig;

/// Diversified late acceptance search.
///
/// Candidates are accepted when they tie the current cost or beat the
/// highest cost in the history. The history tracks how many of its slots
/// sit at that ceiling; once none do, the ceiling is recomputed.
pub struct Dlas {
    history_length: usize,
    margin: f64,
    history: Vec<f64>,
    cost_max: f64,
    at_max: usize,
}

impl Dlas {
    pub fn new(config: &DlasConfig) -> Self {
        Self {
            history_length: config.history_length.max(1),
            margin: config.margin,
            history: Vec::new(),
            cost_max: f64::INFINITY,
            at_max: 0,
        }
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn cost_max(&self) -> f64 {
        self.cost_max
    }
}

impl Acceptance for Dlas {
    fn start(&mut self, baseline: f64, _steps: usize) {
        self.cost_max = baseline + self.margin;
        self.history = vec![self.cost_max; self.history_length];
        self.at_max = self.history_length;
    }

    fn accept(&mut self, _step: usize, candidate: f64, current: f64) -> bool {
        candidate == current || candidate < self.cost_max
    }

    fn update(&mut self, step: usize, current: f64, previous: f64) {
        let v = step % self.history.len();
        if current > self.history[v] {
            self.history[v] = current;
        } else if current < self.history[v] && current < previous {
            if self.history[v] == self.cost_max {
                self.at_max = self.at_max.saturating_sub(1);
            }
            self.history[v] = current;
            if self.at_max == 0 {
                self.cost_max = self.history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                self.at_max = self.history.iter().filter(|&&c| c == self.cost_max).count();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dlas(length: usize, baseline: f64) -> Dlas {
        let mut dlas = Dlas::new(&DlasConfig {
            history_length: length,
            margin: 0.0,
        });
        dlas.start(baseline, 0);
        dlas
    }

    #[test]
    fn test_accepts_ties_and_below_ceiling() {
        let mut dlas = dlas(3, 10.0);
        assert!(dlas.accept(0, 10.0, 10.0));
        assert!(dlas.accept(0, 9.0, 10.0));
        assert!(!dlas.accept(0, 11.0, 10.0));
        // a tie with the ceiling is not below it
        assert!(!dlas.accept(0, 10.0, 9.0));
    }

    #[test]
    fn test_ceiling_drops_once_every_slot_improved() {
        let mut dlas = dlas(2, 10.0);
        dlas.update(0, 9.0, 10.0);
        assert_eq!(dlas.history(), &[9.0, 10.0]);
        assert_eq!(dlas.cost_max(), 10.0);

        dlas.update(1, 8.0, 9.0);
        assert_eq!(dlas.history(), &[9.0, 8.0]);
        assert_eq!(dlas.cost_max(), 9.0);
        assert!(!dlas.accept(2, 9.5, 8.0));
        assert!(dlas.accept(2, 8.5, 8.0));
    }

    #[test]
    fn test_regressions_raise_the_slot() {
        let mut dlas = dlas(2, 10.0);
        dlas.update(0, 9.0, 10.0);
        dlas.update(2, 9.5, 9.0);
        assert_eq!(dlas.history(), &[9.5, 10.0]);
        // no improvement over the previous cost, slot is kept
        dlas.update(3, 9.5, 9.5);
        assert_eq!(dlas.history(), &[9.5, 10.0]);
        assert_eq!(dlas.cost_max(), 10.0);
    }
}
