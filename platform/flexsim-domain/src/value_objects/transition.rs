use crate::value_objects::observation::Observation;

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Observation,
    pub action: usize,
    pub reward: f64,
    pub next_observation: Observation,
    pub done: bool,
}
