//! Error types for the stability engine

use thiserror::Error;

/// Errors that can occur while decoding a request or encoding a response
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("No data provided")]
    NoData,

    #[error("No telemetry data provided")]
    NoTelemetry,

    #[error("No teams data provided")]
    NoTeams,

    #[error("Invalid sample at index {index}: {reason}")]
    InvalidSample { index: usize, reason: String },

    #[error("Invalid logs: expected an array of samples, got {0}")]
    InvalidLogs(&'static str),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl ComputeError {
    /// Whether the caller sent a request of the wrong shape (as opposed to an internal fault)
    pub fn is_input_error(&self) -> bool {
        !matches!(self, ComputeError::EncodingError(_))
    }

    /// Transport status for a failure payload carrying this error
    pub fn status_code(&self) -> u16 {
        if self.is_input_error() {
            400
        } else {
            500
        }
    }
}
