use flexsim_domain::repositories::q_function::{QFunction, TrainingSample};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const INIT_SCALE: f64 = 0.01;

/// One linear head per action, fitted with plain SGD on squared error.
#[derive(Debug, Clone)]
pub struct LinearQFunction {
    inputs: usize,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    learning_rate: f64,
}

impl LinearQFunction {
    pub fn new(inputs: usize, actions: usize, learning_rate: f64, seed: u64) -> Result<Self, String> {
        if actions == 0 {
            return Err("linear q-function needs at least one action".to_string());
        }
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(format!("learning_rate must be > 0 (got {learning_rate})"));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let weights = (0..actions)
            .map(|_| {
                (0..inputs)
                    .map(|_| rng.gen_range(-INIT_SCALE..INIT_SCALE))
                    .collect()
            })
            .collect();
        Ok(Self {
            inputs,
            weights,
            bias: vec![0.0; actions],
            learning_rate,
        })
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    fn value(&self, observation: &[f64], action: usize) -> f64 {
        self.bias[action]
            + self.weights[action]
                .iter()
                .zip(observation)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

impl QFunction for LinearQFunction {
    fn action_count(&self) -> usize {
        self.bias.len()
    }

    fn predict(&self, observation: &[f64]) -> Vec<f64> {
        (0..self.action_count())
            .map(|action| self.value(observation, action))
            .collect()
    }

    fn train(&mut self, batch: &[TrainingSample]) -> Result<f64, String> {
        if batch.is_empty() {
            return Ok(0.0);
        }
        let mut squared = 0.0;
        for sample in batch {
            if sample.observation.len() != self.inputs {
                return Err(format!(
                    "observation has {} features, approximator expects {}",
                    sample.observation.len(),
                    self.inputs
                ));
            }
            if sample.action >= self.action_count() {
                return Err(format!("invalid action {}", sample.action));
            }
            let error = self.value(&sample.observation, sample.action) - sample.target;
            squared += error * error;

            let step = self.learning_rate * error;
            for (w, x) in self.weights[sample.action]
                .iter_mut()
                .zip(&sample.observation)
            {
                *w -= step * x;
            }
            self.bias[sample.action] -= step;
        }

        let loss = squared / batch.len() as f64;
        if !loss.is_finite() {
            return Err("linear q-function diverged (non-finite loss)".to_string());
        }
        Ok(loss)
    }
}
