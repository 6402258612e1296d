use crate::errors::{FlexError, FlexResult};
use serde::{Deserialize, Serialize};

/// Time-ordered table of named numeric columns, one row per simulation step.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    timestamps: Vec<i64>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Dataset {
    pub fn new(timestamps: Vec<i64>, columns: Vec<String>, rows: Vec<Vec<f64>>) -> FlexResult<Self> {
        if timestamps.len() != rows.len() {
            return Err(FlexError::Configuration(format!(
                "dataset has {} timestamps but {} rows",
                timestamps.len(),
                rows.len()
            )));
        }
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(FlexError::Configuration(format!(
                "dataset row {} has {} values, expected {}",
                idx,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self {
            timestamps,
            columns,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col == name)
    }

    pub fn columns_with_prefix(&self, prefix: &str) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, name)| name.starts_with(prefix))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn row(&self, idx: usize) -> Option<&[f64]> {
        self.rows.get(idx).map(|row| row.as_slice())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub rows: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub invalid_values: usize,
    pub first_invalid_value: Option<i64>,
}
