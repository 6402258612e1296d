use crate::entities::dataset::{Dataset, DatasetReport};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DatasetQuery {
    pub path: PathBuf,
    /// Name of the timestamp column.
    pub timestamp_column: String,
}

pub trait DatasetRepository {
    fn load_dataset(&self, query: &DatasetQuery) -> Result<(Dataset, DatasetReport), String>;
}
