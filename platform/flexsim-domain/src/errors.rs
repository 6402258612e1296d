use thiserror::Error;

/// Failures raised by the simulation core. None of them are retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlexError {
    #[error("invalid action {0}: expected 0 (no-op), 1 (charge) or 2 (discharge)")]
    InvalidAction(usize),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

pub type FlexResult<T> = Result<T, FlexError>;
