use super::Agent;
use crate::repositories::q_function::{QFunction, TrainingSample};
use crate::services::memory::ReplayMemory;
use crate::value_objects::observation::Observation;
use crate::value_objects::transition::Transition;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QLearnerConfig {
    pub discount: f64,
    pub batch_size: usize,
    pub epsilon_start: f64,
    pub epsilon_end: f64,
    /// Acting steps over which epsilon moves linearly from start to end.
    pub epsilon_decay_steps: u64,
    pub seed: u64,
}

impl Default for QLearnerConfig {
    fn default() -> Self {
        Self {
            discount: 0.9,
            batch_size: 32,
            epsilon_start: 1.0,
            epsilon_end: 0.1,
            epsilon_decay_steps: 10_000,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    EpsilonGreedy,
    Greedy,
}

impl Policy {
    pub fn label(self) -> &'static str {
        match self {
            Policy::EpsilonGreedy => "e_greedy",
            Policy::Greedy => "greedy",
        }
    }
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate().skip(1) {
        if value.total_cmp(&values[best]).is_gt() {
            best = idx;
        }
    }
    best
}

/// One-step Q-learning over an external function approximator.
pub struct QLearner<Q> {
    config: QLearnerConfig,
    q: Q,
    policy: Policy,
    rng: StdRng,
    acting_steps: u64,
}

impl<Q: QFunction> QLearner<Q> {
    pub fn new(config: QLearnerConfig, q: Q) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            q,
            policy: Policy::EpsilonGreedy,
            acting_steps: 0,
        }
    }

    pub fn set_policy(&mut self, policy: Policy) {
        self.policy = policy;
    }

    pub fn q_function(&self) -> &Q {
        &self.q
    }

    pub fn current_epsilon(&self) -> f64 {
        match self.policy {
            Policy::Greedy => 0.0,
            Policy::EpsilonGreedy => {
                let QLearnerConfig {
                    epsilon_start,
                    epsilon_end,
                    epsilon_decay_steps,
                    ..
                } = self.config;
                if epsilon_decay_steps == 0 {
                    return epsilon_end;
                }
                let progress = (self.acting_steps as f64 / epsilon_decay_steps as f64).min(1.0);
                epsilon_start + (epsilon_end - epsilon_start) * progress
            }
        }
    }

    fn targets(&self, batch: &[&Transition]) -> Vec<TrainingSample> {
        batch
            .iter()
            .map(|t| {
                let bootstrap = if t.done {
                    0.0
                } else {
                    let next = self.q.predict(&t.next_observation.values);
                    next.get(argmax(&next)).copied().unwrap_or(0.0)
                };
                TrainingSample {
                    observation: t.observation.values.clone(),
                    action: t.action,
                    target: t.reward + self.config.discount * bootstrap,
                }
            })
            .collect()
    }
}

impl<Q: QFunction> Agent for QLearner<Q> {
    fn name(&self) -> &str {
        "qlearner"
    }

    fn policy(&self) -> &str {
        self.policy.label()
    }

    fn act(&mut self, observation: &Observation) -> Result<usize, String> {
        let n = self.q.action_count();
        if n == 0 {
            return Err("q-function exposes no actions".to_string());
        }
        let epsilon = self.current_epsilon();
        if self.policy == Policy::EpsilonGreedy {
            self.acting_steps += 1;
        }
        if epsilon > 0.0 && self.rng.gen::<f64>() < epsilon {
            return Ok(self.rng.gen_range(0..n));
        }
        let values = self.q.predict(&observation.values);
        if values.len() != n {
            return Err(format!(
                "q-function returned {} values for {} actions",
                values.len(),
                n
            ));
        }
        Ok(argmax(&values))
    }

    fn learn(&mut self, memory: &ReplayMemory) -> Result<Option<f64>, String> {
        if memory.len() < self.config.batch_size || self.config.batch_size == 0 {
            return Ok(None);
        }
        let batch = memory.sample(self.config.batch_size, &mut self.rng);
        let samples = self.targets(&batch);
        self.q.train(&samples).map(Some)
    }

    fn epsilon(&self) -> Option<f64> {
        Some(self.current_epsilon())
    }
}

impl<Q: QFunction + ?Sized> QFunction for Box<Q> {
    fn action_count(&self) -> usize {
        (**self).action_count()
    }

    fn predict(&self, observation: &[f64]) -> Vec<f64> {
        (**self).predict(observation)
    }

    fn train(&mut self, batch: &[TrainingSample]) -> Result<f64, String> {
        (**self).train(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed values; records every training batch.
    struct FixedQ {
        values: Vec<f64>,
        trained: Vec<Vec<TrainingSample>>,
    }

    impl QFunction for FixedQ {
        fn action_count(&self) -> usize {
            self.values.len()
        }

        fn predict(&self, _observation: &[f64]) -> Vec<f64> {
            self.values.clone()
        }

        fn train(&mut self, batch: &[TrainingSample]) -> Result<f64, String> {
            self.trained.push(batch.to_vec());
            Ok(0.5)
        }
    }

    fn learner(values: Vec<f64>, config: QLearnerConfig) -> QLearner<FixedQ> {
        QLearner::new(
            config,
            FixedQ {
                values,
                trained: Vec::new(),
            },
        )
    }

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), 1);
        assert_eq!(argmax(&[-1.0, -2.0]), 0);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn greedy_policy_picks_best_action() {
        let mut agent = learner(vec![0.0, -1.0, 2.0], QLearnerConfig::default());
        agent.set_policy(Policy::Greedy);
        for _ in 0..20 {
            assert_eq!(agent.act(&Observation::new(vec![0.0])), Ok(2));
        }
        assert_eq!(agent.epsilon(), Some(0.0));
    }

    #[test]
    fn epsilon_decays_linearly_then_holds() {
        let mut agent = learner(
            vec![0.0, 0.0, 0.0],
            QLearnerConfig {
                epsilon_start: 1.0,
                epsilon_end: 0.0,
                epsilon_decay_steps: 4,
                ..QLearnerConfig::default()
            },
        );
        let obs = Observation::new(vec![0.0]);
        assert_eq!(agent.current_epsilon(), 1.0);
        agent.act(&obs).expect("act");
        agent.act(&obs).expect("act");
        assert!((agent.current_epsilon() - 0.5).abs() < 1e-12);
        for _ in 0..10 {
            agent.act(&obs).expect("act");
        }
        assert_eq!(agent.current_epsilon(), 0.0);
    }

    #[test]
    fn exploration_stays_in_action_range() {
        let mut agent = learner(vec![0.0, 0.0, 0.0], QLearnerConfig::default());
        for _ in 0..200 {
            let action = agent.act(&Observation::new(vec![0.0])).expect("act");
            assert!(action < 3);
        }
    }

    #[test]
    fn learn_waits_for_a_full_batch_then_builds_td_targets() {
        let mut agent = learner(
            vec![1.0, 4.0, 2.0],
            QLearnerConfig {
                discount: 0.5,
                batch_size: 2,
                ..QLearnerConfig::default()
            },
        );
        let mut memory = ReplayMemory::new(10);
        let t = |reward: f64, done: bool| Transition {
            observation: Observation::new(vec![0.0]),
            action: 1,
            reward,
            next_observation: Observation::new(vec![1.0]),
            done,
        };
        memory.push(t(-1.0, false));
        assert_eq!(agent.learn(&memory), Ok(None));

        memory.push(t(-3.0, true));
        assert_eq!(agent.learn(&memory), Ok(Some(0.5)));

        let trained = &agent.q_function().trained;
        let mut targets: Vec<f64> = trained[0].iter().map(|s| s.target).collect();
        targets.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(targets, vec![-3.0, -1.0 + 0.5 * 4.0]);
    }
}
