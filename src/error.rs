use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("{}", first_message(.0))]
    Validation(Vec<FieldError>),

    #[error("Application not found")]
    NotFound(String),

    #[error("Authentication token missing")]
    Unauthorized,

    #[error("Application store is at capacity")]
    CapacityExceeded,

    #[error("{0}")]
    RequestFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrackerError {
    /// Shorthand for a validation failure on a single field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        TrackerError::Validation(vec![FieldError::new(field, message)])
    }

    /// Field errors carried by a validation failure; empty for every other variant.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            TrackerError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

fn first_message(errors: &[FieldError]) -> &str {
    errors
        .first()
        .map(|e| e.message.as_str())
        .unwrap_or("Validation failed")
}

pub type Result<T> = std::result::Result<T, TrackerError>;
