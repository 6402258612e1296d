use flexsim_domain::entities::results::{EpisodeSummary, FinalResults};
use flexsim_domain::repositories::artifacts::ArtifactWriter;
use flexsim_domain::value_objects::observation::Observation;
use flexsim_domain::value_objects::step_info::StepInfo;
use std::fs;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemArtifactWriter;

impl FilesystemArtifactWriter {
    pub fn new() -> Self {
        Self
    }
}

fn record_write_metrics(kind: &'static str, start: Instant, result: &Result<(), String>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "flexsim.infra.artifacts.write.calls_total",
        "kind" => kind,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!("flexsim.infra.artifacts.write_ms", "kind" => kind, "result" => result_label)
        .record(start.elapsed().as_millis() as f64);
}

/// Vector columns are stored as JSON arrays in a single CSV cell.
fn vector_cell(observation: &Observation) -> Result<String, String> {
    serde_json::to_string(&observation.values)
        .map_err(|err| format!("failed to serialize observation: {err}"))
}

fn optional_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn write_step_info_csv(path: &Path, steps: &[StepInfo]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create step info csv {}: {}", path.display(), err))?;
    wtr.write_record([
        "step",
        "state",
        "observation",
        "action",
        "reward",
        "next_state",
        "next_observation",
        "done",
        "electricity_price",
        "charge",
        "site_demand",
        "stored",
        "discharged",
        "site_electricity_consumption",
    ])
    .map_err(|err| format!("failed to write step info csv header: {}", err))?;

    for info in steps {
        wtr.write_record([
            info.step.to_string(),
            vector_cell(&info.state)?,
            vector_cell(&info.observation)?,
            info.action.to_string(),
            info.reward.to_string(),
            vector_cell(&info.next_state)?,
            vector_cell(&info.next_observation)?,
            info.done.to_string(),
            info.electricity_price.to_string(),
            info.charge.to_string(),
            info.site_demand.to_string(),
            info.stored.to_string(),
            info.discharged.to_string(),
            info.site_electricity_consumption.to_string(),
        ])
        .map_err(|err| format!("failed to write step info row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush step info csv: {}", err))
}

pub fn write_episodes_csv(path: &Path, episodes: &[EpisodeSummary]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create episodes csv {}: {}", path.display(), err))?;
    wtr.write_record([
        "episode",
        "agent",
        "policy",
        "start_row",
        "steps",
        "total_reward",
        "mean_loss",
        "epsilon",
    ])
    .map_err(|err| format!("failed to write episodes csv header: {}", err))?;

    for summary in episodes {
        wtr.write_record([
            summary.episode.to_string(),
            summary.agent.clone(),
            summary.policy.clone(),
            summary.start_row.to_string(),
            summary.steps.to_string(),
            summary.total_reward.to_string(),
            optional_cell(summary.mean_loss),
            optional_cell(summary.epsilon),
        ])
        .map_err(|err| format!("failed to write episodes row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush episodes csv: {}", err))
}

pub fn write_final_results_csv(path: &Path, results: &FinalResults) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path).map_err(|err| {
        format!(
            "failed to create final results csv {}: {}",
            path.display(),
            err
        )
    })?;
    wtr.serialize(results)
        .map_err(|err| format!("failed to write final results row: {}", err))?;
    wtr.flush()
        .map_err(|err| format!("failed to flush final results csv: {}", err))
}

impl ArtifactWriter for FilesystemArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        let start = Instant::now();
        let result = fs::create_dir_all(path)
            .map_err(|err| format!("failed to create dir {}: {}", path.display(), err));
        record_write_metrics("ensure_dir", start, &result);
        result
    }

    fn write_step_info_csv(&self, path: &Path, steps: &[StepInfo]) -> Result<(), String> {
        let start = Instant::now();
        let result = write_step_info_csv(path, steps);
        record_write_metrics("step_info_csv", start, &result);
        result
    }

    fn write_episodes_csv(&self, path: &Path, episodes: &[EpisodeSummary]) -> Result<(), String> {
        let start = Instant::now();
        let result = write_episodes_csv(path, episodes);
        record_write_metrics("episodes_csv", start, &result);
        result
    }

    fn write_final_results_csv(&self, path: &Path, results: &FinalResults) -> Result<(), String> {
        let start = Instant::now();
        let result = write_final_results_csv(path, results);
        record_write_metrics("final_results_csv", start, &result);
        result
    }

    fn write_summary_json(&self, path: &Path, summary: &serde_json::Value) -> Result<(), String> {
        let start = Instant::now();
        let result = serde_json::to_string_pretty(summary)
            .map_err(|err| format!("failed to serialize summary json: {err}"))
            .and_then(|json| {
                fs::write(path, json).map_err(|err| {
                    format!("failed to write summary json {}: {}", path.display(), err)
                })
            });
        record_write_metrics("summary_json", start, &result);
        result
    }

    fn write_config_snapshot_toml(&self, path: &Path, contents: &str) -> Result<(), String> {
        let start = Instant::now();
        let result = fs::write(path, contents).map_err(|err| {
            format!(
                "failed to write config snapshot {}: {}",
                path.display(),
                err
            )
        });
        record_write_metrics("config_snapshot_toml", start, &result);
        result
    }
}
