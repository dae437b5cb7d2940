//! Error taxonomy for playground services.
//!
//! None of these errors is retried. The controller turns any of them into a
//! `Failed` render and waits for the next edit.

use thiserror::Error;

/// Result alias for playground operations.
pub type PlaygroundResult<T> = Result<T, PlaygroundError>;

#[derive(Debug, Error)]
pub enum PlaygroundError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("Request to {service} failed: {message}")]
    Request {
        service: &'static str,
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("{service} returned status {status}")]
    Status {
        service: &'static str,
        status: u16,
    },

    /// The response body did not have the expected shape.
    #[error("Could not decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PlaygroundError {
    pub fn request(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Request {
            service,
            message: err.to_string(),
        }
    }

    pub fn decode(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            service,
            message: err.to_string(),
        }
    }

    /// Whether this error came from a remote service rather than local I/O.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Request { .. } | Self::Status { .. } | Self::Decode { .. }
        )
    }
}
