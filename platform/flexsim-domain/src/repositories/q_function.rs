/// One regression target for the action-value approximator.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub observation: Vec<f64>,
    pub action: usize,
    pub target: f64,
}

/// Black-box action-value function approximator.
pub trait QFunction {
    fn action_count(&self) -> usize;

    /// One value per action.
    fn predict(&self, observation: &[f64]) -> Vec<f64>;

    /// Fits a batch of targets and returns the batch loss.
    fn train(&mut self, batch: &[TrainingSample]) -> Result<f64, String>;
}
