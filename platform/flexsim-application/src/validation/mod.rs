use crate::config::{build_classifier, AgentMode, Config};
use flexsim_domain::entities::dataset::{Dataset, DatasetReport};
use flexsim_domain::repositories::dataset::{DatasetQuery, DatasetRepository};
use flexsim_domain::services::env::flex::FlexEnv;
use flexsim_domain::services::env::Environment;
use flexsim_domain::services::spaces::{EpisodeData, DEMAND};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info_span;

/// Checks that a config, its dataset and the derived environment fit together
/// without running any episode.
pub fn validate(
    config: &Config,
    strict: bool,
    datasets: &dyn DatasetRepository,
) -> Result<serde_json::Value, String> {
    let _span = info_span!(
        "validate",
        strict = strict,
        run_id = %config.run.run_id,
        mode = ?config.agent.mode
    )
    .entered();

    let flex_config = config.flex_config()?;
    let stage_start = Instant::now();
    let (dataset, report) = datasets.load_dataset(&DatasetQuery {
        path: PathBuf::from(&config.data.path),
        timestamp_column: config.timestamp_column().to_string(),
    })?;
    metrics::histogram!("flexsim.validate.load_dataset_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let negative_demand = negative_demand_rows(&dataset);
    if strict
        && (report.duplicates > 0
            || report.out_of_order > 0
            || report.invalid_values > 0
            || negative_demand > 0)
    {
        return Err(format!(
            "strict validation failed: {} duplicates, {} out of order, {} invalid values, {} negative demand rows",
            report.duplicates, report.out_of_order, report.invalid_values, negative_demand
        ));
    }

    let data = EpisodeData::from_dataset(&dataset, config.data.minute_markers.unwrap_or(false))
        .map_err(|err| format!("failed to build spaces: {err}"))?;
    let env = FlexEnv::new(flex_config, data)
        .map_err(|err| format!("failed to build environment: {err}"))?;

    let strategies = match (&config.classifier, config.agent.mode) {
        (Some(_), _) | (None, AgentMode::Classifier) => {
            Some(build_classifier(config, env.observation_info())?.strategies().len())
        }
        (None, _) => None,
    };

    metrics::gauge!("flexsim.validate.dataset.duplicates").set(report.duplicates as f64);
    metrics::gauge!("flexsim.validate.dataset.invalid_values").set(report.invalid_values as f64);
    metrics::gauge!("flexsim.validate.dataset.negative_demand").set(negative_demand as f64);

    let env_config = env.config();
    Ok(serde_json::json!({
        "dataset": dataset_json(&report, negative_demand),
        "env": {
            "capacity": env_config.capacity,
            "release_time": env_config.release_time,
            "episode_length": env_config.episode_length,
            "episode_start": env_config.episode_start,
            "lag": env_config.lag,
            "available_starts": env.available_starts(),
            "action_count": env.action_count(),
        },
        "observation_features": env.observation_info().len(),
        "state_features": env.state_info().len(),
        "agent_mode": config.agent.mode,
        "strategies": strategies,
    }))
}

/// Rows the environment would refuse to step through.
fn negative_demand_rows(dataset: &Dataset) -> usize {
    let Some(col) = dataset.column_index(DEMAND) else {
        return 0;
    };
    (0..dataset.len())
        .filter_map(|r| dataset.row(r))
        .filter(|row| row[col] < 0.0)
        .count()
}

fn dataset_json(report: &DatasetReport, negative_demand: usize) -> serde_json::Value {
    serde_json::json!({
        "rows": report.rows,
        "duplicates": report.duplicates,
        "out_of_order": report.out_of_order,
        "invalid_values": report.invalid_values,
        "first_invalid_value": report.first_invalid_value,
        "negative_demand": negative_demand,
    })
}
