use crate::entities::results::{EpisodeSummary, FinalResults};
use crate::value_objects::step_info::StepInfo;
use std::path::Path;

pub trait ArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String>;
    fn write_step_info_csv(&self, path: &Path, steps: &[StepInfo]) -> Result<(), String>;
    fn write_episodes_csv(&self, path: &Path, episodes: &[EpisodeSummary]) -> Result<(), String>;
    fn write_final_results_csv(&self, path: &Path, results: &FinalResults) -> Result<(), String>;
    fn write_summary_json(&self, path: &Path, summary: &serde_json::Value) -> Result<(), String>;
    fn write_config_snapshot_toml(&self, path: &Path, contents: &str) -> Result<(), String>;
}
