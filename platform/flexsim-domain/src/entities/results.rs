use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub agent: String,
    pub policy: String,
    pub start_row: usize,
    pub steps: usize,
    pub total_reward: f64,
    pub mean_loss: Option<f64>,
    pub epsilon: Option<f64>,
}

/// Headline numbers of an experiment, in currency per episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResults {
    pub naive_reward: f64,
    pub optimal_reward: f64,
    pub value: f64,
    pub run_time_ms: u64,
    pub episodes: usize,
}

impl FinalResults {
    pub fn new(naive_reward: f64, optimal_reward: f64, run_time_ms: u64, episodes: usize) -> Self {
        Self {
            naive_reward,
            optimal_reward,
            value: optimal_reward - naive_reward,
            run_time_ms,
            episodes,
        }
    }
}
