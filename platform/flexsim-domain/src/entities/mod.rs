pub mod dataset;
pub mod results;
pub mod storage;
