use crate::errors::FlexResult;
use crate::services::spaces::FeatureIndex;
use crate::value_objects::observation::Observation;
use crate::value_objects::step_info::StepInfo;

pub mod flex;

/// A discrete-time control environment driven one step at a time.
pub trait Environment {
    fn reset(&mut self) -> FlexResult<Observation>;

    fn step(&mut self, action: usize) -> FlexResult<StepResult>;

    /// Names of the observation vector, in order.
    fn observation_info(&self) -> &FeatureIndex;

    fn action_count(&self) -> usize;

    fn episode_length(&self) -> usize;

    /// Every step record of the current episode.
    fn info_log(&self) -> &[StepInfo];
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}
