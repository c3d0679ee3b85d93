use super::Acceptance;
use crate::streams::decision_stream;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use squish_core::AnnealConfig;

/// Simulated annealing with an exponential schedule from `start_temp` to
/// `end_temp` over the step budget.
pub struct Anneal {
    start_temp: f64,
    end_temp: f64,
    steps: usize,
    rng: ChaCha8Rng,
}

impl Anneal {
    pub fn new(config: &AnnealConfig, seed: u64) -> Self {
        Self {
            start_temp: config.start_temp,
            end_temp: config.end_temp,
            steps: 0,
            rng: decision_stream(seed),
        }
    }

    /// Temperature at `step`; stays at `start_temp` without a budget.
    pub fn temperature(&self, step: usize) -> f64 {
        let alpha = if self.steps <= 1 {
            0.0
        } else {
            step as f64 / (self.steps - 1) as f64
        };
        ((1.0 - alpha) * self.start_temp.ln() + alpha * self.end_temp.ln()).exp()
    }
}

impl Acceptance for Anneal {
    fn start(&mut self, _baseline: f64, steps: usize) {
        self.steps = steps;
    }

    fn accept(&mut self, step: usize, candidate: f64, current: f64) -> bool {
        if candidate < current {
            return true;
        }
        let temp = self.temperature(step);
        let u: f64 = self.rng.gen();
        (-(candidate - current) / temp).exp() >= u
    }
}
