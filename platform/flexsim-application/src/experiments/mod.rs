use crate::config::{build_classifier, AgentMode, Config};
use crate::episodes::{run_episode, EpisodeOutcome, EpisodeSettings};
use crate::reporting::{summary_json, SummaryInput};
use flexsim_domain::entities::results::{EpisodeSummary, FinalResults};
use flexsim_domain::repositories::artifacts::ArtifactWriter;
use flexsim_domain::repositories::dataset::{DatasetQuery, DatasetRepository};
use flexsim_domain::repositories::q_function::QFunction;
use flexsim_domain::services::agent::{Agent, AgentKind, NaiveAgent, Policy, QLearner};
use flexsim_domain::services::env::flex::FlexEnv;
use flexsim_domain::services::env::Environment;
use flexsim_domain::services::memory::ReplayMemory;
use flexsim_domain::services::spaces::EpisodeData;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, info_span};

/// Builds the action-value approximator from `(observation_size, action_count)`.
pub type QFunctionFactory<'a> = &'a dyn Fn(usize, usize) -> Result<Box<dyn QFunction>, String>;

#[derive(Debug, Clone)]
pub struct ExperimentResult {
    pub run_dir: PathBuf,
    pub episodes: Vec<EpisodeSummary>,
    pub final_results: FinalResults,
}

/// Picks the dataset row each episode starts at. The baseline and the final
/// evaluation always use the configured start so their rewards compare.
enum StartSampler {
    Fixed(usize),
    Random {
        base: usize,
        available: usize,
        rng: StdRng,
    },
}

impl StartSampler {
    fn new(config: &Config, env: &FlexEnv) -> Self {
        let base = env.config().episode_start;
        if config.env.random_start.unwrap_or(false) {
            StartSampler::Random {
                base,
                available: env.available_starts().max(1),
                rng: StdRng::seed_from_u64(config.seed().wrapping_add(1)),
            }
        } else {
            StartSampler::Fixed(base)
        }
    }

    fn baseline(&self) -> usize {
        match self {
            StartSampler::Fixed(start) => *start,
            StartSampler::Random { base, .. } => *base,
        }
    }

    fn next(&mut self) -> usize {
        match self {
            StartSampler::Fixed(start) => *start,
            StartSampler::Random { available, rng, .. } => rng.gen_range(0..*available),
        }
    }
}

struct Runner<'a> {
    env: FlexEnv,
    memory: ReplayMemory,
    artifacts: &'a dyn ArtifactWriter,
    run_dir: PathBuf,
    output_every: usize,
    learn_every: usize,
    summaries: Vec<EpisodeSummary>,
}

impl Runner<'_> {
    fn episode(
        &mut self,
        agent: &mut dyn Agent,
        episode: usize,
        start_row: usize,
        learn: bool,
    ) -> Result<EpisodeOutcome, String> {
        let stage_start = Instant::now();
        let outcome = run_episode(
            &mut self.env,
            agent,
            &mut self.memory,
            EpisodeSettings {
                episode,
                start_row,
                learn_every: if learn { self.learn_every } else { 0 },
            },
        )?;
        metrics::histogram!("flexsim.experiment.episode_ms")
            .record(stage_start.elapsed().as_millis() as f64);
        info!(
            episode,
            policy = %outcome.summary.policy,
            start_row,
            total_reward = outcome.summary.total_reward,
            epsilon = ?outcome.summary.epsilon,
            "episode complete"
        );
        self.summaries.push(outcome.summary.clone());

        if self.output_every > 0 && episode > 0 && episode % self.output_every == 0 {
            self.write_outputs(&outcome)?;
        }
        Ok(outcome)
    }

    fn write_outputs(&self, outcome: &EpisodeOutcome) -> Result<(), String> {
        self.artifacts
            .write_episodes_csv(&self.run_dir.join("episodes.csv"), &self.summaries)?;
        self.artifacts.write_step_info_csv(
            &info_path(&self.run_dir, outcome.summary.episode),
            &outcome.steps,
        )
    }
}

/// `None` in naive mode: the baseline is the whole run.
fn build_agent(
    config: &Config,
    env: &FlexEnv,
    q_function: Option<QFunctionFactory<'_>>,
) -> Result<Option<AgentKind>, String> {
    match config.agent.mode {
        AgentMode::Naive => Ok(None),
        AgentMode::Classifier => Ok(Some(AgentKind::Classifier(build_classifier(
            config,
            env.observation_info(),
        )?))),
        AgentMode::Qlearner => {
            let factory = q_function
                .ok_or_else(|| "agent.mode = \"qlearner\" requires a q-function".to_string())?;
            let q = factory(env.observation_info().len(), env.action_count())?;
            if q.action_count() != env.action_count() {
                return Err(format!(
                    "q-function has {} outputs but the environment has {} actions",
                    q.action_count(),
                    env.action_count()
                ));
            }
            Ok(Some(AgentKind::QLearner(QLearner::new(
                config.qlearner_config(),
                q,
            ))))
        }
    }
}

fn info_path(run_dir: &Path, episode: usize) -> PathBuf {
    run_dir.join(format!("info_episode_{episode}.csv"))
}

/// Naive baseline, then the configured agent. The last episode of the run is
/// the one compared against the baseline.
pub fn run_experiment(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    datasets: &dyn DatasetRepository,
    artifacts: &dyn ArtifactWriter,
    q_function: Option<QFunctionFactory<'_>>,
) -> Result<ExperimentResult, String> {
    let _span = info_span!(
        "run_experiment",
        run_id = %config.run.run_id,
        mode = ?config.agent.mode,
        episodes = config.run.episodes
    )
    .entered();
    let started = Instant::now();

    let flex_config = config.flex_config()?;
    let stage_start = Instant::now();
    let (dataset, report) = datasets.load_dataset(&DatasetQuery {
        path: PathBuf::from(&config.data.path),
        timestamp_column: config.timestamp_column().to_string(),
    })?;
    metrics::histogram!("flexsim.dataset.load_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    info!(
        rows = report.rows,
        duplicates = report.duplicates,
        out_of_order = report.out_of_order,
        invalid_values = report.invalid_values,
        "dataset loaded"
    );

    let data = EpisodeData::from_dataset(&dataset, config.data.minute_markers.unwrap_or(false))
        .map_err(|err| format!("failed to build spaces: {err}"))?;
    let env = FlexEnv::new(flex_config, data)
        .map_err(|err| format!("failed to build environment: {err}"))?;
    let observation_info = env.observation_info().names().to_vec();
    let state_info = env.state_info().names().to_vec();

    let run_dir = out
        .unwrap_or_else(|| PathBuf::from(&config.paths.out_dir))
        .join(&config.run.run_id);
    artifacts.ensure_dir(&run_dir)?;
    artifacts.write_config_snapshot_toml(&run_dir.join("config_snapshot.toml"), config_toml)?;

    let mut starts = StartSampler::new(config, &env);
    let mut runner = Runner {
        env,
        memory: ReplayMemory::new(config.memory_size()),
        artifacts,
        run_dir: run_dir.clone(),
        output_every: config.output_every(),
        learn_every: config.learn_every(),
        summaries: Vec::new(),
    };

    let mut naive = AgentKind::Naive(NaiveAgent::default());
    let baseline = runner.episode(&mut naive, 0, starts.baseline(), false)?;
    artifacts.write_step_info_csv(&info_path(&run_dir, 0), &baseline.steps)?;
    let naive_reward = baseline.summary.total_reward;

    let episodes = config.run.episodes;
    let evaluation = match build_agent(config, &runner.env, q_function)? {
        None => baseline,
        Some(mut agent) => {
            let learning = matches!(agent, AgentKind::QLearner(_));
            let mut last = None;
            for episode in 1..=episodes {
                let start_row = if episode == episodes && !learning {
                    starts.baseline()
                } else {
                    starts.next()
                };
                last = Some(runner.episode(&mut agent, episode, start_row, learning)?);
            }
            if let AgentKind::QLearner(learner) = &mut agent {
                learner.set_policy(Policy::Greedy);
                last = Some(runner.episode(&mut agent, episodes + 1, starts.baseline(), false)?);
            }
            last.unwrap_or(baseline)
        }
    };

    let final_results = FinalResults::new(
        naive_reward,
        evaluation.summary.total_reward,
        started.elapsed().as_millis() as u64,
        evaluation.summary.episode,
    );
    runner.write_outputs(&evaluation)?;
    artifacts.write_final_results_csv(&run_dir.join("final_results.csv"), &final_results)?;
    let summary = summary_json(&SummaryInput {
        config,
        config_toml,
        final_results: &final_results,
        episodes: &runner.summaries,
        observation_info: &observation_info,
        state_info: &state_info,
        dataset_rows: dataset.len(),
    });
    artifacts.write_summary_json(&run_dir.join("summary.json"), &summary)?;

    info!(
        naive_reward = final_results.naive_reward,
        optimal_reward = final_results.optimal_reward,
        value = final_results.value,
        run_time_ms = final_results.run_time_ms,
        "experiment finished"
    );

    Ok(ExperimentResult {
        run_dir,
        episodes: runner.summaries,
        final_results,
    })
}
