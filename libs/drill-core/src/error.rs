//! Error types for drill-core.

use thiserror::Error;

/// Result type alias using EngineError.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the drill engine.
///
/// None of these are fatal: callers surface them and keep going.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("not enough quizzable entries: have {available}, need {required}")]
    InsufficientPool { available: usize, required: usize },

    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}
