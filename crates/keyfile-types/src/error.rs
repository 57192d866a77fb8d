use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid uuid: {0}")]
    InvalidUuid(String),

    #[error("invalid cycle: {0}")]
    InvalidCycle(String),

    #[error("cycle {0} has no successor")]
    CycleOverflow(u32),
}
