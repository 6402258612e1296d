use flexsim_application::experiments::QFunctionFactory;
use std::path::PathBuf;

pub(super) fn run_experiment(config_path: PathBuf, out: Option<PathBuf>) -> Result<(), String> {
    let (config, config_toml) =
        flexsim_application::config::load_config_with_source(&config_path)?;
    super::common::print_config_summary("run", &config, out.as_ref());

    let overall_start = std::time::Instant::now();
    let deps = crate::infra::build_engine_deps(&config);
    let factory: QFunctionFactory<'_> = &|inputs, actions| deps.q_function(inputs, actions);

    let result = flexsim_application::experiments::run_experiment(
        &config,
        &config_toml,
        out,
        deps.datasets.as_ref(),
        deps.artifacts.as_ref(),
        Some(factory),
    )?;

    let results = &result.final_results;
    println!(
        "final results: naive_reward={:.4}, optimal_reward={:.4}, value={:.4}, episodes={}",
        results.naive_reward, results.optimal_reward, results.value, results.episodes
    );
    println!("run output: {}", result.run_dir.display());
    println!(
        "flexsim cli: run total_ms={}",
        overall_start.elapsed().as_millis()
    );
    Ok(())
}
