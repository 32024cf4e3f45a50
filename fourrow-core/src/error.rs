//! Error types shared across the workspace

use thiserror::Error;

/// Errors raised at the boundary of the decision core
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid action ({row}, {col}): cell is occupied or off the board")]
    InvalidAction { row: usize, col: usize },

    #[error("no legal actions: the position is already decided")]
    EmptyActionSet,

    #[error("expected {expected} parameters, got {got}")]
    ParamCount { expected: usize, got: usize },

    #[error("malformed board key: {reason}")]
    InvalidKey { reason: String },

    #[error("action index {index} is outside the board")]
    InvalidIndex { index: usize },
}

/// Result alias for the workspace's fallible operations
pub type Result<T> = std::result::Result<T, Error>;
