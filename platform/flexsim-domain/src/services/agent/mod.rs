use crate::repositories::q_function::QFunction;
use crate::services::classifier::ClassifierAgent;
use crate::services::memory::ReplayMemory;
use crate::value_objects::action::FlexAction;
use crate::value_objects::observation::Observation;

mod qlearner;

pub use qlearner::{argmax, Policy, QLearner, QLearnerConfig};

/// Action-selection side of the episode loop.
pub trait Agent {
    fn name(&self) -> &str;

    fn policy(&self) -> &str {
        "fixed"
    }

    fn act(&mut self, observation: &Observation) -> Result<usize, String>;

    /// Called by the loop on its learning schedule. Returns the training loss
    /// when an update happened.
    fn learn(&mut self, _memory: &ReplayMemory) -> Result<Option<f64>, String> {
        Ok(None)
    }

    fn epsilon(&self) -> Option<f64> {
        None
    }
}

/// Baseline that never flexes.
#[derive(Debug, Clone, Copy)]
pub struct NaiveAgent {
    no_op: usize,
}

impl NaiveAgent {
    pub fn new(no_op: usize) -> Self {
        Self { no_op }
    }
}

impl Default for NaiveAgent {
    fn default() -> Self {
        Self::new(FlexAction::NoOp.index())
    }
}

impl Agent for NaiveAgent {
    fn name(&self) -> &str {
        "naive"
    }

    fn act(&mut self, _observation: &Observation) -> Result<usize, String> {
        Ok(self.no_op)
    }
}

impl Agent for ClassifierAgent {
    fn name(&self) -> &str {
        "classifier"
    }

    fn policy(&self) -> &str {
        "rules"
    }

    fn act(&mut self, observation: &Observation) -> Result<usize, String> {
        self.check_observation(observation)
            .map_err(|err| err.to_string())
    }
}

#[allow(clippy::large_enum_variant)]
pub enum AgentKind {
    Naive(NaiveAgent),
    Classifier(ClassifierAgent),
    QLearner(QLearner<Box<dyn QFunction>>),
}

impl Agent for AgentKind {
    fn name(&self) -> &str {
        match self {
            AgentKind::Naive(agent) => agent.name(),
            AgentKind::Classifier(agent) => agent.name(),
            AgentKind::QLearner(agent) => agent.name(),
        }
    }

    fn policy(&self) -> &str {
        match self {
            AgentKind::Naive(agent) => agent.policy(),
            AgentKind::Classifier(agent) => agent.policy(),
            AgentKind::QLearner(agent) => agent.policy(),
        }
    }

    fn act(&mut self, observation: &Observation) -> Result<usize, String> {
        match self {
            AgentKind::Naive(agent) => agent.act(observation),
            AgentKind::Classifier(agent) => agent.act(observation),
            AgentKind::QLearner(agent) => agent.act(observation),
        }
    }

    fn learn(&mut self, memory: &ReplayMemory) -> Result<Option<f64>, String> {
        match self {
            AgentKind::Naive(agent) => agent.learn(memory),
            AgentKind::Classifier(agent) => agent.learn(memory),
            AgentKind::QLearner(agent) => agent.learn(memory),
        }
    }

    fn epsilon(&self) -> Option<f64> {
        match self {
            AgentKind::Naive(agent) => agent.epsilon(),
            AgentKind::Classifier(agent) => agent.epsilon(),
            AgentKind::QLearner(agent) => agent.epsilon(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Agent, NaiveAgent};
    use crate::value_objects::observation::Observation;

    #[test]
    fn naive_agent_always_returns_no_op() {
        let mut agent = NaiveAgent::default();
        for value in [0.0, 1.0, 100.0] {
            assert_eq!(agent.act(&Observation::new(vec![value])), Ok(0));
        }
        assert_eq!(agent.epsilon(), None);
    }
}
