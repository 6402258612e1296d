use flexsim_application::config::{AgentMode, Config};
use flexsim_application::experiments::{run_experiment, QFunctionFactory};
use flexsim_application::validation::validate;
use flexsim_domain::entities::dataset::{Dataset, DatasetReport};
use flexsim_domain::entities::results::{EpisodeSummary, FinalResults};
use flexsim_domain::repositories::artifacts::ArtifactWriter;
use flexsim_domain::repositories::dataset::{DatasetQuery, DatasetRepository};
use flexsim_domain::repositories::q_function::QFunction;
use flexsim_domain::services::spaces::{price_bin_name, DEMAND, ELECTRICITY_PRICE};
use flexsim_domain::value_objects::step_info::StepInfo;
use flexsim_infrastructure::approximators::LinearQFunction;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

const START_TS: i64 = 1_767_225_600;

struct FakeDatasetRepo {
    dataset: Dataset,
    report: DatasetReport,
    queries: RefCell<Vec<DatasetQuery>>,
}

impl FakeDatasetRepo {
    /// Five-minute rows alternating between a cheap and an expensive price bin.
    fn alternating(rows: usize) -> Self {
        let columns = vec![
            DEMAND.to_string(),
            ELECTRICITY_PRICE.to_string(),
            price_bin_name(0, 0),
            price_bin_name(0, 1),
        ];
        let values = (0..rows)
            .map(|i| {
                let cheap = (i / 6) % 2 == 0;
                let price = if cheap { 20.0 } else { 80.0 };
                let (bin_0, bin_1) = if cheap { (1.0, 0.0) } else { (0.0, 1.0) };
                vec![10.0, price, bin_0, bin_1]
            })
            .collect();
        let timestamps = (0..rows as i64).map(|i| START_TS + i * 300).collect();
        Self {
            dataset: Dataset::new(timestamps, columns, values).expect("dataset"),
            report: DatasetReport {
                rows,
                ..DatasetReport::default()
            },
            queries: RefCell::new(Vec::new()),
        }
    }
}

impl FakeDatasetRepo {
    fn with_negative_demand_at(rows: usize, bad_row: usize) -> Self {
        let mut repo = Self::alternating(rows);
        let values = (0..repo.dataset.len())
            .filter_map(|r| repo.dataset.row(r))
            .enumerate()
            .map(|(r, row)| {
                let mut row = row.to_vec();
                if r == bad_row {
                    row[0] = -10.0;
                }
                row
            })
            .collect();
        repo.dataset = Dataset::new(
            repo.dataset.timestamps().to_vec(),
            repo.dataset.columns().to_vec(),
            values,
        )
        .expect("dataset");
        repo
    }
}

impl DatasetRepository for FakeDatasetRepo {
    fn load_dataset(&self, query: &DatasetQuery) -> Result<(Dataset, DatasetReport), String> {
        self.queries.borrow_mut().push(query.clone());
        Ok((self.dataset.clone(), self.report.clone()))
    }
}

#[derive(Default)]
struct RecordingWriter {
    ensured_dirs: RefCell<Vec<PathBuf>>,
    step_files: RefCell<Vec<(PathBuf, usize)>>,
    episodes_written: RefCell<Option<usize>>,
    final_results: RefCell<Option<FinalResults>>,
    summary: RefCell<Option<serde_json::Value>>,
    config_snapshot: RefCell<Option<String>>,
}

impl RecordingWriter {
    fn step_file_names(&self) -> Vec<String> {
        self.step_files
            .borrow()
            .iter()
            .filter_map(|(path, _)| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }
}

impl ArtifactWriter for RecordingWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        self.ensured_dirs.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn write_step_info_csv(&self, path: &Path, steps: &[StepInfo]) -> Result<(), String> {
        self.step_files
            .borrow_mut()
            .push((path.to_path_buf(), steps.len()));
        Ok(())
    }

    fn write_episodes_csv(&self, _path: &Path, episodes: &[EpisodeSummary]) -> Result<(), String> {
        *self.episodes_written.borrow_mut() = Some(episodes.len());
        Ok(())
    }

    fn write_final_results_csv(&self, _path: &Path, results: &FinalResults) -> Result<(), String> {
        *self.final_results.borrow_mut() = Some(results.clone());
        Ok(())
    }

    fn write_summary_json(&self, _path: &Path, summary: &serde_json::Value) -> Result<(), String> {
        *self.summary.borrow_mut() = Some(summary.clone());
        Ok(())
    }

    fn write_config_snapshot_toml(&self, _path: &Path, contents: &str) -> Result<(), String> {
        *self.config_snapshot.borrow_mut() = Some(contents.to_string());
        Ok(())
    }
}

const BASE_CONFIG: &str = r#"
[run]
run_id = "use_case"
seed = 3
episodes = 4
output_every = 2

[data]
path = "unused.csv"

[env]
capacity = 2.0
release_time = 4
episode_length = 24

[agent]
mode = "naive"

[paths]
out_dir = "runs"
"#;

fn config_with(mode: AgentMode, extra: &str) -> (Config, String) {
    let mode_label = match mode {
        AgentMode::Naive => "naive",
        AgentMode::Qlearner => "qlearner",
        AgentMode::Classifier => "classifier",
    };
    let raw = format!(
        "{}\n{}",
        BASE_CONFIG.replace("mode = \"naive\"", &format!("mode = \"{mode_label}\"")),
        extra
    );
    let config: Config = toml::from_str(&raw).expect("config");
    (config, raw)
}

fn linear_factory(inputs: usize, actions: usize) -> Result<Box<dyn QFunction>, String> {
    Ok(Box::new(LinearQFunction::new(inputs, actions, 0.001, 11)?))
}

#[test]
fn naive_mode_runs_only_the_baseline() {
    let (config, raw) = config_with(AgentMode::Naive, "");
    let repo = FakeDatasetRepo::alternating(48);
    let writer = RecordingWriter::default();

    let result = run_experiment(&config, &raw, None, &repo, &writer, None).expect("run");

    assert_eq!(result.episodes.len(), 1);
    assert_eq!(result.run_dir, PathBuf::from("runs").join("use_case"));
    assert_eq!(result.final_results.value, 0.0);
    assert_eq!(result.final_results.episodes, 0);
    assert_eq!(writer.ensured_dirs.borrow().len(), 1);
    assert_eq!(writer.config_snapshot.borrow().as_deref(), Some(raw.as_str()));
    assert_eq!(repo.queries.borrow()[0].timestamp_column, "timestamp");
    assert!(writer
        .step_file_names()
        .iter()
        .all(|name| name == "info_episode_0.csv"));
    assert_eq!(writer.step_files.borrow()[0].1, 23);
}

#[test]
fn classifier_mode_charges_on_cheap_bins_and_reports_value() {
    let classifier = r#"
[classifier]
no_op = 0

[[classifier.strategies]]
name = "strat_cheap"
action = 1
conditions = [{ horizon = 0, bin = 0, operation = "==" }]
"#;
    let (config, raw) = config_with(AgentMode::Classifier, classifier);
    let repo = FakeDatasetRepo::alternating(48);
    let writer = RecordingWriter::default();

    let result = run_experiment(
        &config,
        &raw,
        Some(PathBuf::from("/tmp/out")),
        &repo,
        &writer,
        None,
    )
    .expect("run");

    assert_eq!(result.run_dir, PathBuf::from("/tmp/out").join("use_case"));
    assert_eq!(result.episodes.len(), 5);
    assert!(result.episodes[1..].iter().all(|e| e.agent == "classifier"));
    assert_eq!(result.final_results.episodes, 4);
    assert_eq!(
        result.final_results.optimal_reward,
        result.episodes[4].total_reward
    );
    assert!(
        (result.final_results.value
            - (result.final_results.optimal_reward - result.final_results.naive_reward))
            .abs()
            < 1e-9
    );

    let names = writer.step_file_names();
    assert!(names.contains(&"info_episode_0.csv".to_string()));
    assert!(names.contains(&"info_episode_2.csv".to_string()));
    assert!(names.contains(&"info_episode_4.csv".to_string()));
    assert!(!names.contains(&"info_episode_3.csv".to_string()));
    assert_eq!(*writer.episodes_written.borrow(), Some(5));

    let summary = writer.summary.borrow().clone().expect("summary");
    assert_eq!(summary["run"]["run_id"], "use_case");
    assert_eq!(summary["run"]["agent_mode"], "classifier");
    assert_eq!(summary["run"]["config_hash"].as_str().map(str::len), Some(12));
    assert_eq!(summary["episodes_recorded"], 5);
}

#[test]
fn qlearner_mode_trains_then_runs_greedy() {
    let qlearner = r#"
[qlearner]
batch_size = 4
memory_size = 200
epsilon_decay_steps = 50
"#;
    let (config, raw) = config_with(AgentMode::Qlearner, qlearner);
    let repo = FakeDatasetRepo::alternating(48);
    let writer = RecordingWriter::default();

    let factory: QFunctionFactory<'_> = &linear_factory;
    let result =
        run_experiment(&config, &raw, None, &repo, &writer, Some(factory)).expect("run");

    assert_eq!(result.episodes.len(), 6);
    let learning = &result.episodes[1..5];
    assert!(learning.iter().all(|e| e.policy == "e_greedy"));
    assert!(learning.iter().any(|e| e.mean_loss.is_some()));
    let epsilons: Vec<f64> = learning.iter().filter_map(|e| e.epsilon).collect();
    assert!(epsilons.windows(2).all(|w| w[1] <= w[0]));

    let last = result.episodes.last().expect("greedy episode");
    assert_eq!(last.policy, "greedy");
    assert_eq!(last.episode, 5);
    assert_eq!(last.start_row, 0);
    assert_eq!(result.final_results.optimal_reward, last.total_reward);
    assert!(writer.final_results.borrow().is_some());
}

#[test]
fn qlearner_mode_without_approximator_fails() {
    let (config, raw) = config_with(AgentMode::Qlearner, "");
    let repo = FakeDatasetRepo::alternating(48);
    let writer = RecordingWriter::default();

    let err = run_experiment(&config, &raw, None, &repo, &writer, None).expect_err("no q");
    assert!(err.contains("q-function"));
}

#[test]
fn random_starts_stay_inside_the_dataset() {
    let (_config, raw) = config_with(
        AgentMode::Classifier,
        r#"
[classifier]
no_op = 0

[[classifier.strategies]]
name = "strat_cheap"
action = 1
conditions = [{ horizon = 0, bin = 0, operation = "==" }]
"#,
    );
    let raw = raw.replace("episode_length = 24", "episode_length = 24\nrandom_start = true");
    let config: Config = toml::from_str(&raw).expect("config");
    assert_eq!(config.env.random_start, Some(true));
    let repo = FakeDatasetRepo::alternating(40);
    let writer = RecordingWriter::default();

    let result = run_experiment(&config, &raw, None, &repo, &writer, None).expect("run");
    assert!(result.episodes.iter().all(|e| e.start_row + 24 <= 40));
    assert_eq!(result.episodes[0].start_row, 0);
    assert_eq!(result.episodes.last().map(|e| e.start_row), Some(0));
}

#[test]
fn validate_reports_environment_and_strategies() {
    let (config, _raw) = config_with(
        AgentMode::Classifier,
        r#"
[classifier]
no_op = 0

[[classifier.strategies]]
name = "strat_cheap"
action = 1
conditions = [{ horizon = 0, bin = 0, operation = "==" }]

[[classifier.strategies]]
name = "strat_expensive"
action = 2
conditions = [{ horizon = 0, bin = 1, operation = "==" }]
"#,
    );
    let repo = FakeDatasetRepo::alternating(48);

    let report = validate(&config, true, &repo).expect("validate");
    assert_eq!(report["dataset"]["rows"], 48);
    assert_eq!(report["env"]["available_starts"], 25);
    assert_eq!(report["env"]["action_count"], 3);
    assert_eq!(report["strategies"], 2);
    // two price bins plus the charge level
    assert_eq!(report["observation_features"], 3);
}

#[test]
fn validate_rejects_unknown_classifier_features() {
    let (config, _raw) = config_with(
        AgentMode::Classifier,
        r#"
[classifier]
no_op = 0

[[classifier.strategies]]
name = "strat_far"
action = 1
conditions = [{ horizon = 6, bin = 0, operation = "==" }]
"#,
    );
    let repo = FakeDatasetRepo::alternating(48);

    let err = validate(&config, false, &repo).expect_err("missing feature");
    assert!(err.contains("D_h_6_Predicted_Price_Bin_0"));
}

#[test]
fn strict_validate_fails_on_dirty_data() {
    let (config, _raw) = config_with(AgentMode::Naive, "");
    let mut repo = FakeDatasetRepo::alternating(48);
    repo.report.duplicates = 2;

    assert!(validate(&config, false, &repo).is_ok());
    let err = validate(&config, true, &repo).expect_err("strict");
    assert!(err.contains("2 duplicates"));
}

#[test]
fn negative_demand_fails_strict_validation_and_the_run() {
    let (config, raw) = config_with(AgentMode::Naive, "");
    let repo = FakeDatasetRepo::with_negative_demand_at(48, 5);

    let report = validate(&config, false, &repo).expect("lenient");
    assert_eq!(report["dataset"]["negative_demand"], 1);
    let err = validate(&config, true, &repo).expect_err("strict");
    assert!(err.contains("1 negative demand rows"), "{err}");

    let writer = RecordingWriter::default();
    let err = run_experiment(&config, &raw, None, &repo, &writer, None).expect_err("run");
    assert!(err.contains("negative"), "{err}");
    assert!(writer.final_results.borrow().is_none());
}

#[test]
fn episode_window_larger_than_dataset_is_rejected() {
    let (config, raw) = config_with(AgentMode::Naive, "");
    let repo = FakeDatasetRepo::alternating(10);
    let writer = RecordingWriter::default();

    let err = run_experiment(&config, &raw, None, &repo, &writer, None).expect_err("window");
    assert!(err.contains("failed to build environment"));
    assert!(writer.ensured_dirs.borrow().is_empty());
}
