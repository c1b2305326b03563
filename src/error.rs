//! Error types for the pagination engine

use thiserror::Error;

/// Errors reported by the pagination engine and its collaborators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaginationError {
    /// A layout value is out of range; the engine keeps its prior state
    #[error("invalid config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },

    /// The metrics provider does not know this font family
    #[error("no metrics available for font family {family:?}")]
    MeasurementUnavailable { family: String },

    #[error("engine has not been initialized")]
    Uninitialized,

    #[error("engine has been destroyed")]
    Destroyed,

    /// Malformed JSON at the WASM or CLI edge
    #[error("json error: {0}")]
    Json(String),
}

impl PaginationError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str) -> Self {
        PaginationError::InvalidConfig { field, reason }
    }
}

impl From<serde_json::Error> for PaginationError {
    fn from(err: serde_json::Error) -> Self {
        PaginationError::Json(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PaginationError>;
