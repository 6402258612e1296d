use super::{Environment, StepResult};
use crate::entities::storage::StorageHistory;
use crate::errors::{FlexError, FlexResult};
use crate::services::spaces::{EpisodeData, FeatureIndex, CHARGE_LEVEL, DEMAND, ELECTRICITY_PRICE};
use crate::value_objects::action::FlexAction;
use crate::value_objects::observation::Observation;
use crate::value_objects::step_info::StepInfo;
use tracing::debug;

/// Absolute tolerance on charge checks (MWh).
pub const CHARGE_TOLERANCE: f64 = 1e-9;

/// Sub-periods per hour at the simulation's 5 minute resolution.
const STEPS_PER_HOUR: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlexConfig {
    /// MWh.
    pub capacity: f64,
    /// Number of 5 minute slots energy stays stored before release.
    pub release_time: usize,
    pub episode_length: usize,
    /// Dataset row of the first step used by `reset`.
    pub episode_start: usize,
    /// Steps the observation trails the state by.
    pub lag: usize,
}

impl Default for FlexConfig {
    fn default() -> Self {
        Self {
            capacity: 2.0,
            release_time: 4,
            episode_length: 48,
            episode_start: 0,
            lag: 0,
        }
    }
}

impl FlexConfig {
    pub fn validate(&self) -> FlexResult<()> {
        if !self.capacity.is_finite() || self.capacity <= 0.0 {
            return Err(FlexError::Configuration(format!(
                "capacity must be a positive number of MWh, got {}",
                self.capacity
            )));
        }
        if self.release_time == 0 {
            return Err(FlexError::Configuration(
                "release_time must be at least one slot".to_string(),
            ));
        }
        if self.episode_length < 2 {
            return Err(FlexError::Configuration(format!(
                "episode_length must be at least 2, got {}",
                self.episode_length
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvPhase {
    Uninitialized,
    Ready,
    Done,
    /// An invariant broke mid-step; only `reset` leaves this phase.
    Failed,
}

/// Price-responsive flexible load backed by a thermal store.
///
/// Charging shifts demand into the store; stored energy is released
/// `release_time` steps later, or all at once on discharge.
#[derive(Debug, Clone)]
pub struct FlexEnv {
    config: FlexConfig,
    data: EpisodeData,
    history: StorageHistory,
    phase: EnvPhase,
    start: usize,
    steps: usize,
    state: Observation,
    observation: Observation,
    info_log: Vec<StepInfo>,
}

impl FlexEnv {
    pub fn new(config: FlexConfig, mut data: EpisodeData) -> FlexResult<Self> {
        config.validate()?;
        data.observation.extend(CHARGE_LEVEL)?;
        let env = Self {
            history: StorageHistory::new(config.release_time),
            config,
            data,
            phase: EnvPhase::Uninitialized,
            start: config.episode_start,
            steps: 0,
            state: Observation::default(),
            observation: Observation::default(),
            info_log: Vec::new(),
        };
        env.check_window(config.episode_start)?;
        Ok(env)
    }

    pub fn config(&self) -> &FlexConfig {
        &self.config
    }

    pub fn phase(&self) -> EnvPhase {
        self.phase
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn charge(&self) -> f64 {
        self.history.charge()
    }

    pub fn storage(&self) -> &StorageHistory {
        &self.history
    }

    pub fn state_info(&self) -> &FeatureIndex {
        self.data.state.index()
    }

    /// Number of episode start rows the dataset can host.
    pub fn available_starts(&self) -> usize {
        (self.data.size() + 1).saturating_sub(self.config.episode_length)
    }

    /// Resets onto the episode beginning at dataset row `start`.
    pub fn reset_at(&mut self, start: usize) -> FlexResult<Observation> {
        self.check_window(start)?;
        self.start = start;
        self.steps = 0;
        self.history.reset();
        self.info_log.clear();

        self.state = self.data.state.at(self.start)?;
        self.observation = self.observe(0)?;
        self.phase = EnvPhase::Ready;
        Ok(self.observation.clone())
    }

    fn check_window(&self, start: usize) -> FlexResult<()> {
        let end = start.saturating_add(self.config.episode_length);
        if end > self.data.size() {
            return Err(FlexError::Configuration(format!(
                "episode rows {}..{} exceed dataset of {} rows",
                start,
                end,
                self.data.size()
            )));
        }
        Ok(())
    }

    fn observe(&self, step: usize) -> FlexResult<Observation> {
        let row = self.start + step.saturating_sub(self.config.lag);
        self.data.observation.at(row, &[self.history.charge()])
    }

    /// Moves energy through the store for one step. Returns `(stored, discharged)`.
    fn transfer(
        &mut self,
        action: FlexAction,
        row: usize,
        site_demand: f64,
    ) -> FlexResult<(f64, f64)> {
        if site_demand.is_nan() || site_demand < 0.0 {
            return Err(FlexError::InvariantViolation(format!(
                "demand {site_demand} MWh at row {row} is negative"
            )));
        }
        let capacity = self.config.capacity;
        let flows = match action {
            FlexAction::NoOp => self.history.advance(|_| 0.0),
            FlexAction::Charge => self
                .history
                .advance(|charge| (capacity - charge).min(site_demand)),
            FlexAction::Discharge => {
                let discharged = self.history.release_all();
                let residual = self.history.charge();
                if residual.abs() > CHARGE_TOLERANCE {
                    return Err(FlexError::InvariantViolation(format!(
                        "discharge left {residual} MWh in storage"
                    )));
                }
                (0.0, discharged)
            }
        };
        self.check_charge()?;
        Ok(flows)
    }

    fn check_charge(&self) -> FlexResult<()> {
        let charge = self.history.charge();
        if charge < -CHARGE_TOLERANCE || charge > self.config.capacity + CHARGE_TOLERANCE {
            return Err(FlexError::InvariantViolation(format!(
                "charge {} MWh outside [0, {}]",
                charge, self.config.capacity
            )));
        }
        Ok(())
    }
}

impl Environment for FlexEnv {
    fn reset(&mut self) -> FlexResult<Observation> {
        self.reset_at(self.config.episode_start)
    }

    fn step(&mut self, action: usize) -> FlexResult<StepResult> {
        match self.phase {
            EnvPhase::Uninitialized => {
                return Err(FlexError::InvalidState(
                    "step called before reset".to_string(),
                ))
            }
            EnvPhase::Done => {
                return Err(FlexError::InvalidState(
                    "episode is done; reset before stepping again".to_string(),
                ))
            }
            EnvPhase::Failed => {
                return Err(FlexError::InvalidState(
                    "environment failed an invariant check; reset before stepping again"
                        .to_string(),
                ))
            }
            EnvPhase::Ready => {}
        }
        let action = FlexAction::try_from(action)?;

        let row = self.start + self.steps;
        let site_demand = self.data.state.value(row, DEMAND)? / STEPS_PER_HOUR;
        let electricity_price = self.data.state.value(row, ELECTRICITY_PRICE)?;

        let before = self.history.clone();
        let (stored, discharged) = match self.transfer(action, row, site_demand) {
            Ok(flows) => flows,
            Err(err) => {
                self.history = before;
                self.phase = EnvPhase::Failed;
                return Err(err);
            }
        };

        let net = stored - discharged;
        let site_electricity_consumption = site_demand - net;
        let reward = -(site_electricity_consumption / STEPS_PER_HOUR) * electricity_price;

        let next_step = self.steps + 1;
        let next_state = self.data.state.at(self.start + next_step)?;
        let next_observation = self.observe(next_step)?;
        self.steps = next_step;
        let done = self.steps == self.config.episode_length - 1;

        let info = StepInfo {
            step: self.steps,
            state: std::mem::replace(&mut self.state, next_state.clone()),
            observation: std::mem::replace(&mut self.observation, next_observation.clone()),
            action: action.index(),
            reward,
            next_state,
            next_observation: next_observation.clone(),
            done,
            electricity_price,
            charge: self.history.charge(),
            site_demand,
            stored,
            discharged,
            site_electricity_consumption,
        };
        debug!(
            step = info.step,
            action = action.label(),
            charge = info.charge,
            stored,
            discharged,
            reward,
            done,
            "flex step"
        );
        self.info_log.push(info.clone());

        if done {
            self.phase = EnvPhase::Done;
        }

        Ok(StepResult {
            observation: next_observation,
            reward,
            done,
            info,
        })
    }

    fn observation_info(&self) -> &FeatureIndex {
        self.data.observation.index()
    }

    fn action_count(&self) -> usize {
        FlexAction::COUNT
    }

    fn episode_length(&self) -> usize {
        self.config.episode_length
    }

    fn info_log(&self) -> &[StepInfo] {
        &self.info_log
    }
}
