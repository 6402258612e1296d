pub mod agent;
pub mod classifier;
pub mod env;
pub mod memory;
pub mod spaces;
