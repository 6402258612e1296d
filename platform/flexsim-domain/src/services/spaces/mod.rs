use crate::entities::dataset::Dataset;
use crate::errors::{FlexError, FlexResult};
use crate::value_objects::observation::Observation;
use chrono::{DateTime, Timelike, Utc};
use std::collections::HashMap;

pub const STATE_PREFIX: &str = "C_";
pub const OBSERVATION_PREFIX: &str = "D_";

pub const DEMAND: &str = "C_demand [MW]";
pub const ELECTRICITY_PRICE: &str = "C_electricity_price [$/MWh]";
pub const CHARGE_LEVEL: &str = "C_charge_level [MWh]";

pub const MINUTE_MARKER_STEP: u32 = 5;

pub fn minute_marker_name(minute: u32) -> String {
    format!("D_min_{minute}")
}

pub fn price_bin_name(horizon: u32, bin: u32) -> String {
    format!("D_h_{horizon}_Predicted_Price_Bin_{bin}")
}

/// Ordered, unique feature names with constant-time lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureIndex {
    pub fn new<I, S>(names: I) -> FlexResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::default();
        for name in names {
            index.push(name)?;
        }
        Ok(index)
    }

    pub fn push(&mut self, name: impl Into<String>) -> FlexResult<usize> {
        let name = name.into();
        if self.positions.contains_key(&name) {
            return Err(FlexError::Configuration(format!(
                "duplicate feature name `{name}`"
            )));
        }
        let idx = self.names.len();
        self.positions.insert(name.clone(), idx);
        self.names.push(name);
        Ok(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn require(&self, name: &str) -> FlexResult<usize> {
        self.index_of(name).ok_or_else(|| {
            FlexError::Configuration(format!("feature `{name}` is not in the observation index"))
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Internal physics state, one row per dataset step.
#[derive(Debug, Clone)]
pub struct StateSpace {
    index: FeatureIndex,
    rows: Vec<Vec<f64>>,
}

impl StateSpace {
    pub fn from_dataset(dataset: &Dataset) -> FlexResult<Self> {
        let cols = dataset.columns_with_prefix(STATE_PREFIX);
        let index = FeatureIndex::new(cols.iter().map(|&c| dataset.columns()[c].clone()))?;
        index.require(DEMAND)?;
        index.require(ELECTRICITY_PRICE)?;

        let rows = (0..dataset.len())
            .filter_map(|r| dataset.row(r))
            .map(|row| cols.iter().map(|&c| row[c]).collect())
            .collect();
        Ok(Self { index, rows })
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn index(&self) -> &FeatureIndex {
        &self.index
    }

    pub fn at(&self, step: usize) -> FlexResult<Observation> {
        self.rows
            .get(step)
            .map(|row| Observation::new(row.clone()))
            .ok_or_else(|| out_of_range("state", step, self.rows.len()))
    }

    pub fn value(&self, step: usize, name: &str) -> FlexResult<f64> {
        let col = self.index.require(name)?;
        self.rows
            .get(step)
            .map(|row| row[col])
            .ok_or_else(|| out_of_range("state", step, self.rows.len()))
    }
}

/// Agent-visible features: dataset `D_` columns, optional minute markers, then
/// derived features registered through `extend`.
#[derive(Debug, Clone)]
pub struct ObservationSpace {
    index: FeatureIndex,
    rows: Vec<Vec<f64>>,
    derived: usize,
}

impl ObservationSpace {
    pub fn from_dataset(dataset: &Dataset, minute_markers: bool) -> FlexResult<Self> {
        let cols = dataset.columns_with_prefix(OBSERVATION_PREFIX);
        let mut index = FeatureIndex::new(cols.iter().map(|&c| dataset.columns()[c].clone()))?;
        let markers: Vec<u32> = if minute_markers {
            (0..60).step_by(MINUTE_MARKER_STEP as usize).collect()
        } else {
            Vec::new()
        };
        for minute in &markers {
            index.push(minute_marker_name(*minute))?;
        }

        let mut rows = Vec::with_capacity(dataset.len());
        for (r, ts) in dataset.timestamps().iter().enumerate() {
            let Some(row) = dataset.row(r) else {
                continue;
            };
            let mut values: Vec<f64> = cols.iter().map(|&c| row[c]).collect();
            if !markers.is_empty() {
                let minute = minute_of(*ts)?;
                values.extend(markers.iter().map(|m| if *m == minute { 1.0 } else { 0.0 }));
            }
            rows.push(values);
        }

        Ok(Self {
            index,
            rows,
            derived: 0,
        })
    }

    /// Registers a derived feature appended after the dataset features.
    pub fn extend(&mut self, name: impl Into<String>) -> FlexResult<usize> {
        let idx = self.index.push(name)?;
        self.derived += 1;
        Ok(idx)
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn index(&self) -> &FeatureIndex {
        &self.index
    }

    pub fn at(&self, step: usize, derived: &[f64]) -> FlexResult<Observation> {
        if derived.len() != self.derived {
            return Err(FlexError::InvalidState(format!(
                "expected {} derived features, got {}",
                self.derived,
                derived.len()
            )));
        }
        let row = self
            .rows
            .get(step)
            .ok_or_else(|| out_of_range("observation", step, self.rows.len()))?;
        let mut values = Vec::with_capacity(self.index.len());
        values.extend_from_slice(row);
        values.extend_from_slice(derived);
        Ok(Observation::new(values))
    }
}

/// Both spaces over the same dataset rows.
#[derive(Debug, Clone)]
pub struct EpisodeData {
    pub state: StateSpace,
    pub observation: ObservationSpace,
}

impl EpisodeData {
    pub fn from_dataset(dataset: &Dataset, minute_markers: bool) -> FlexResult<Self> {
        Ok(Self {
            state: StateSpace::from_dataset(dataset)?,
            observation: ObservationSpace::from_dataset(dataset, minute_markers)?,
        })
    }

    pub fn size(&self) -> usize {
        self.state.size()
    }
}

fn minute_of(timestamp: i64) -> FlexResult<u32> {
    let dt = DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or_else(|| {
        FlexError::Configuration(format!("timestamp {timestamp} is out of range"))
    })?;
    let minute = dt.minute();
    Ok(minute - minute % MINUTE_MARKER_STEP)
}

fn out_of_range(space: &str, step: usize, size: usize) -> FlexError {
    FlexError::InvalidState(format!(
        "{space} index {step} is outside the dataset (size {size})"
    ))
}
