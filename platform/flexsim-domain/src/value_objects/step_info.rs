use crate::value_objects::observation::Observation;

/// Per-step diagnostic record. Field names are the export schema.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    pub step: usize,
    pub state: Observation,
    pub observation: Observation,
    pub action: usize,
    pub reward: f64,
    pub next_state: Observation,
    pub next_observation: Observation,
    pub done: bool,

    pub electricity_price: f64,
    pub charge: f64,
    pub site_demand: f64,
    pub stored: f64,
    pub discharged: f64,
    pub site_electricity_consumption: f64,
}
