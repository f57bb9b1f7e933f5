//! Error types for the adaptive metabolism engine

use thiserror::Error;

/// Errors that can occur during estimation or coaching.
///
/// Insufficient tracking history is deliberately absent: it is reported as a
/// zero-confidence estimate, not as an error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid user profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
