use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by the client.
///
/// Validation failures (`MissingIdentifier`, `AuthRequired` for a missing
/// token) are raised before any network call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    #[error("No identifier provided")]
    MissingIdentifier,

    #[error("Authentication required")]
    AuthRequired,

    #[error("No data received")]
    EmptyResponse,

    #[error("{message}")]
    FetchFailed {
        /// HTTP status, `None` for transport failures.
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("{item}: {message}")]
    PartialDataUnavailable { item: String, message: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn fetch_failed(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            status,
            message: message.into(),
        }
    }

    /// Machine-readable code, stable across message changes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingIdentifier => "MISSING_IDENTIFIER",
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::EmptyResponse => "EMPTY_RESPONSE",
            Self::FetchFailed { .. } => "FETCH_FAILED",
            Self::MalformedMessage(_) => "MALFORMED_MESSAGE",
            Self::Channel(_) => "CHANNEL_ERROR",
            Self::PartialDataUnavailable { .. } => "PARTIAL_DATA_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidUrl(_) => "INVALID_URL",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Transport failures, timeouts and 5xx responses may succeed on retry;
    /// everything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::FetchFailed { status: None, .. } => true,
            Self::FetchFailed {
                status: Some(status),
                ..
            } => *status >= 500 || *status == 429,
            Self::Timeout(_) | Self::Channel(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
