//! Errors raised by model parsing and state transitions

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Amount out of range: {0}")]
    AmountOverflow(String),
}
