pub mod approximators;
pub mod artifacts;
pub mod dataset;
