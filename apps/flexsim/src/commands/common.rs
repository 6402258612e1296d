use flexsim_application::config::Config;
use std::path::PathBuf;

pub(super) fn print_config_summary(command: &str, config: &Config, out: Option<&PathBuf>) {
    println!(
        "flexsim cli: {} (run_id={}, mode={:?}, episodes={}, seed={})",
        command,
        config.run.run_id,
        config.agent.mode,
        config.run.episodes,
        config.seed()
    );
    println!(
        "data: path={}, timestamp_column={}, minute_markers={}, out_dir={}",
        config.data.path,
        config.timestamp_column(),
        config.data.minute_markers.unwrap_or(false),
        config.paths.out_dir
    );
    println!(
        "env: capacity={}, release_time={}, episode_length={}, episode_start={}, random_start={}, lag={}",
        config.env.capacity,
        config.env.release_time,
        config.env.episode_length,
        config.env.episode_start.unwrap_or(0),
        config.env.random_start.unwrap_or(false),
        config.env.lag.unwrap_or(0)
    );
    if let Some(classifier) = &config.classifier {
        println!(
            "classifier: strategies={}, no_op={}, stop_action={:?}",
            classifier.strategies.len(),
            classifier.no_op,
            classifier.stop_action
        );
    }
    if let Some(out_dir) = out {
        println!("output dir: {}", out_dir.display());
    }
}
