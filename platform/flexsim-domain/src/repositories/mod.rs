pub mod artifacts;
pub mod dataset;
pub mod q_function;
