//! Error types for Placemetrics

use thiserror::Error;

/// Errors that can occur while validating input or computing features
#[derive(Debug, Error)]
pub enum MobilityError {
    #[error("Invalid value in column '{column}' at row {row}: {reason}")]
    InvalidValue {
        column: &'static str,
        row: usize,
        reason: String,
    },

    #[error("Column length mismatch: {left} ({left_len}) vs {right} ({right_len})")]
    LengthMismatch {
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid window rule: {0}")]
    InvalidWindowRule(String),

    #[error("Timestamp parse error: {0}")]
    TimestampError(String),

    #[error("Invalid UTC offset: {0}")]
    InvalidTimezone(String),
}
