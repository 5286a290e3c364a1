//! Error types for the ETL recorder

use thiserror::Error;

/// Errors raised at the edges of the recorder (config, encoding, replay input, sensors).
///
/// The recording state machines themselves never fail; invalid call sequences
/// are reported through `bool` / `Option` return values instead.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Gaze sensor error: {0}")]
    SensorError(String),

    #[error("Invalid event stream: {0}")]
    InvalidEventStream(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
