use flexsim_domain::services::classifier::{
    ClassifierAgent, ClassifierCondition, Operation, StopPrecedence, StrategyConfig,
};
use flexsim_domain::services::env::flex::FlexConfig;
use flexsim_domain::services::spaces::FeatureIndex;
use flexsim_domain::services::agent::QLearnerConfig as DomainQLearnerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    Naive,
    Qlearner,
    Classifier,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    pub data: DataConfig,
    pub env: EnvConfig,
    pub agent: AgentConfig,
    pub qlearner: Option<QLearnerConfig>,
    pub classifier: Option<ClassifierConfig>,
    pub paths: PathsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub run_id: String,
    pub seed: Option<u64>,
    /// Learning episodes after the naive baseline.
    pub episodes: usize,
    /// Write outputs every n episodes; 0 writes only at the end.
    pub output_every: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    pub path: String,
    pub timestamp_column: Option<String>,
    pub minute_markers: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct EnvConfig {
    pub capacity: f64,
    pub release_time: usize,
    pub episode_length: usize,
    pub episode_start: Option<usize>,
    pub random_start: Option<bool>,
    pub lag: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub mode: AgentMode,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct QLearnerConfig {
    pub discount: Option<f64>,
    pub batch_size: Option<usize>,
    pub memory_size: Option<usize>,
    pub learn_every: Option<usize>,
    pub epsilon_start: Option<f64>,
    pub epsilon_end: Option<f64>,
    pub epsilon_decay_steps: Option<u64>,
    pub learning_rate: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    pub no_op: usize,
    pub stop_action: Option<usize>,
    pub stop_precedence: Option<StopPrecedence>,
    pub strategies: Vec<StrategyEntry>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StrategyEntry {
    pub name: String,
    pub action: usize,
    pub no_op: Option<usize>,
    pub conditions: Vec<ConditionEntry>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConditionEntry {
    pub horizon: u32,
    pub bin: u32,
    pub operation: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub out_dir: String,
}

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_MEMORY_SIZE: usize = 10_000;
pub const DEFAULT_LEARN_EVERY: usize = 1;
pub const DEFAULT_LEARNING_RATE: f64 = 0.001;

pub fn load_config(path: &Path) -> Result<Config, String> {
    let (config, _source) = load_config_with_source(path)?;
    Ok(config)
}

pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    Ok((config, contents))
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config)
        .map_err(|err| format!("failed to serialize config as TOML: {err}"))
}

impl Config {
    pub fn seed(&self) -> u64 {
        self.run.seed.unwrap_or(DEFAULT_SEED)
    }

    pub fn output_every(&self) -> usize {
        self.run.output_every.unwrap_or(0)
    }

    pub fn timestamp_column(&self) -> &str {
        self.data.timestamp_column.as_deref().unwrap_or("timestamp")
    }

    pub fn flex_config(&self) -> Result<FlexConfig, String> {
        let flex = FlexConfig {
            capacity: self.env.capacity,
            release_time: self.env.release_time,
            episode_length: self.env.episode_length,
            episode_start: self.env.episode_start.unwrap_or(0),
            lag: self.env.lag.unwrap_or(0),
        };
        flex.validate().map_err(|err| err.to_string())?;
        Ok(flex)
    }

    pub fn qlearner_config(&self) -> DomainQLearnerConfig {
        let defaults = DomainQLearnerConfig::default();
        let Some(q) = &self.qlearner else {
            return DomainQLearnerConfig {
                seed: self.seed(),
                ..defaults
            };
        };
        DomainQLearnerConfig {
            discount: q.discount.unwrap_or(defaults.discount),
            batch_size: q.batch_size.unwrap_or(defaults.batch_size),
            epsilon_start: q.epsilon_start.unwrap_or(defaults.epsilon_start),
            epsilon_end: q.epsilon_end.unwrap_or(defaults.epsilon_end),
            epsilon_decay_steps: q
                .epsilon_decay_steps
                .unwrap_or(defaults.epsilon_decay_steps),
            seed: self.seed(),
        }
    }

    pub fn memory_size(&self) -> usize {
        self.qlearner
            .as_ref()
            .and_then(|q| q.memory_size)
            .unwrap_or(DEFAULT_MEMORY_SIZE)
    }

    pub fn learn_every(&self) -> usize {
        self.qlearner
            .as_ref()
            .and_then(|q| q.learn_every)
            .unwrap_or(DEFAULT_LEARN_EVERY)
    }

    pub fn learning_rate(&self) -> f64 {
        self.qlearner
            .as_ref()
            .and_then(|q| q.learning_rate)
            .unwrap_or(DEFAULT_LEARNING_RATE)
    }
}

/// Maps the TOML strategy entries to domain strategies, in registration order.
pub fn resolve_strategies(classifier: &ClassifierConfig) -> Result<Vec<StrategyConfig>, String> {
    classifier
        .strategies
        .iter()
        .map(|entry| {
            let conditions = entry
                .conditions
                .iter()
                .map(|cond| {
                    let operation = Operation::parse(&cond.operation).map_err(|err| {
                        format!("strategy `{}`: {}", entry.name, err)
                    })?;
                    Ok(ClassifierCondition {
                        horizon: cond.horizon,
                        bin: cond.bin,
                        operation,
                    })
                })
                .collect::<Result<Vec<_>, String>>()?;
            Ok(StrategyConfig {
                name: entry.name.clone(),
                conditions,
                action: entry.action,
                no_op: entry.no_op.unwrap_or(classifier.no_op),
            })
        })
        .collect()
}

pub fn build_classifier(
    config: &Config,
    observation_info: &FeatureIndex,
) -> Result<ClassifierAgent, String> {
    let classifier = config
        .classifier
        .as_ref()
        .ok_or_else(|| "agent.mode = \"classifier\" requires a [classifier] section".to_string())?;
    let strategies = resolve_strategies(classifier)?;
    ClassifierAgent::new(
        strategies,
        observation_info,
        classifier.no_op,
        classifier.stop_action,
        classifier.stop_precedence.unwrap_or_default(),
    )
    .map_err(|err| err.to_string())
}
