//! Error types for the field engine.

use crate::sources::SourceId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("{function}: parameter m = {parameter} is outside [0, 1]")]
    Domain {
        function: &'static str,
        parameter: f64,
    },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidMutation { key: String, reason: String },

    #[error("No source with id {0}")]
    UnknownSource(SourceId),

    #[error("Invalid sampling grid: {0}")]
    InvalidGrid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FieldError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        FieldError::InvalidMutation {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FieldError>;
