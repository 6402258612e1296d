pub mod config;
pub mod episodes;
pub mod experiments;
pub mod reporting;
pub mod validation;
