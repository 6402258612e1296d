use crate::errors::{FlexError, FlexResult};
use crate::services::spaces::{minute_marker_name, price_bin_name, FeatureIndex};
use crate::value_objects::observation::Observation;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Equals,
    NotEquals,
}

impl Operation {
    pub fn parse(raw: &str) -> FlexResult<Self> {
        match raw.trim() {
            "==" => Ok(Operation::Equals),
            "!=" => Ok(Operation::NotEquals),
            other => Err(FlexError::Configuration(format!(
                "unknown condition operation `{other}` (expected `==` or `!=`)"
            ))),
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Operation::Equals => lhs == rhs,
            Operation::NotEquals => lhs != rhs,
        }
    }
}

/// Compares the predicted price-bin flag for (`horizon`, `bin`) with 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierCondition {
    pub horizon: u32,
    pub bin: u32,
    pub operation: Operation,
}

impl ClassifierCondition {
    pub fn feature_name(&self) -> String {
        price_bin_name(self.horizon, self.bin)
    }
}

/// Caller-side description of one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub name: String,
    pub conditions: Vec<ClassifierCondition>,
    pub action: usize,
    pub no_op: usize,
}

/// A deterministic rule: emit `action` when every condition holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierStrategy {
    name: String,
    conditions: Vec<(ClassifierCondition, usize)>,
    action: usize,
    no_op: usize,
    width: usize,
}

impl ClassifierStrategy {
    pub fn new(config: StrategyConfig, observation_info: &FeatureIndex) -> FlexResult<Self> {
        if !config.name.starts_with("strat") {
            return Err(FlexError::Configuration(format!(
                "strategy name `{}` must start with `strat`",
                config.name
            )));
        }
        if config.conditions.is_empty() {
            return Err(FlexError::Configuration(format!(
                "strategy `{}` has no conditions",
                config.name
            )));
        }
        let conditions = config
            .conditions
            .into_iter()
            .map(|cond| {
                let idx = observation_info.require(&cond.feature_name())?;
                Ok((cond, idx))
            })
            .collect::<FlexResult<Vec<_>>>()?;

        Ok(Self {
            name: config.name,
            conditions,
            action: config.action,
            no_op: config.no_op,
            width: observation_info.len(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> usize {
        self.action
    }

    pub fn check_observation(&self, observation: &Observation) -> FlexResult<usize> {
        check_width(observation, self.width)?;
        for (cond, idx) in &self.conditions {
            if !cond.operation.apply(feature(observation, *idx)?, 1.0) {
                return Ok(self.no_op);
            }
        }
        Ok(self.action)
    }
}

fn check_width(observation: &Observation, width: usize) -> FlexResult<()> {
    if observation.len() != width {
        return Err(FlexError::InvalidState(format!(
            "observation has {} features, classifier expects {}",
            observation.len(),
            width
        )));
    }
    Ok(())
}

fn feature(observation: &Observation, idx: usize) -> FlexResult<f64> {
    observation.get(idx).ok_or_else(|| {
        FlexError::InvalidState(format!(
            "observation has no feature at position {idx} (width {})",
            observation.len()
        ))
    })
}

/// How the stop-action guard combines the two half-hour markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopPrecedence {
    /// `min_0 || (min_55 && action != no_op)`.
    #[default]
    Literal,
    /// `(min_0 || min_55) && action != no_op`.
    Grouped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StopGuard {
    action: usize,
    min_0: usize,
    min_55: usize,
    precedence: StopPrecedence,
}

/// Rule-based agent: a priority list of strategies, last registered wins.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierAgent {
    strategies: Vec<ClassifierStrategy>,
    no_op: usize,
    stop: Option<StopGuard>,
    width: usize,
}

impl ClassifierAgent {
    pub fn new(
        strategies: Vec<StrategyConfig>,
        observation_info: &FeatureIndex,
        no_op: usize,
        stop_action: Option<usize>,
        precedence: StopPrecedence,
    ) -> FlexResult<Self> {
        if strategies.is_empty() {
            return Err(FlexError::Configuration(
                "classifier needs at least one strategy".to_string(),
            ));
        }
        let strategies = strategies
            .into_iter()
            .map(|config| ClassifierStrategy::new(config, observation_info))
            .collect::<FlexResult<Vec<_>>>()?;
        for strategy in &strategies {
            debug!(
                strategy = strategy.name(),
                action = strategy.action(),
                conditions = strategy.conditions.len(),
                "classifier strategy registered"
            );
        }

        let stop = match stop_action {
            Some(action) => Some(StopGuard {
                action,
                min_0: observation_info.require(&minute_marker_name(0))?,
                min_55: observation_info.require(&minute_marker_name(55))?,
                precedence,
            }),
            None => None,
        };

        Ok(Self {
            strategies,
            no_op,
            stop,
            width: observation_info.len(),
        })
    }

    pub fn strategies(&self) -> &[ClassifierStrategy] {
        &self.strategies
    }

    pub fn no_op(&self) -> usize {
        self.no_op
    }

    pub fn check_observation(&self, observation: &Observation) -> FlexResult<usize> {
        check_width(observation, self.width)?;
        let actions = self
            .strategies
            .iter()
            .map(|strategy| strategy.check_observation(observation))
            .collect::<FlexResult<Vec<usize>>>()?;

        let mut action = self.no_op;
        if let Some(fired) = actions.iter().rev().find(|act| **act != self.no_op) {
            action = *fired;
        }

        if let Some(stop) = &self.stop {
            let min_0 = feature(observation, stop.min_0)? == 1.0;
            let min_55 = feature(observation, stop.min_55)? == 1.0;
            let acting = action != self.no_op;
            let halt = match stop.precedence {
                StopPrecedence::Literal => min_0 || (min_55 && acting),
                StopPrecedence::Grouped => (min_0 || min_55) && acting,
            };
            if halt {
                debug!(min_0, min_55, from = action, to = stop.action, "action stopped at half hour");
                action = stop.action;
            }
        }

        debug!(?actions, action, "classifier action selected");
        Ok(action)
    }
}
