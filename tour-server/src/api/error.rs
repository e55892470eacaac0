//! Tour API error types and their classification.

use chrono::{DateTime, Utc};

use super::convert::ConversionError;

/// Status code the backend uses for "results are still being computed".
pub const STATUS_NOT_READY: u16 = 425;

/// Errors from the tour backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Search results aren't computed yet. Not a failure.
    #[error("search results are not ready yet")]
    NotReady { wait_until: Option<DateTime<Utc>> },

    /// Unknown token, hotel, or other resource
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend rejected the request as malformed
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Any other non-2xx response
    #[error("API error {status}: {message}")]
    Server { status: u16, message: String },

    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body wasn't the JSON we expected
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// Response parsed but didn't hold valid data
    #[error("invalid response: {0}")]
    Conversion(#[from] ConversionError),
}

/// How the search engine should react to a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Poll again once the (optional) readiness time has passed.
    NotReady(Option<DateTime<Utc>>),
    /// Worth retrying while the retry budget lasts.
    Transient,
    /// Retrying won't help.
    Fatal,
}

impl ApiError {
    /// Map a backend status code (and the message/readiness time from its
    /// error body) to an error.
    ///
    /// 425 is "not ready", 404 "not found", 400 "bad request"; anything else
    /// is a server error.
    pub fn from_status(status: u16, message: String, wait_until: Option<DateTime<Utc>>) -> Self {
        match status {
            STATUS_NOT_READY => ApiError::NotReady { wait_until },
            404 => ApiError::NotFound(message),
            400 => ApiError::BadRequest(message),
            _ => ApiError::Server { status, message },
        }
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            ApiError::NotReady { wait_until } => Disposition::NotReady(*wait_until),
            ApiError::BadRequest(_) => Disposition::Fatal,
            _ => Disposition::Transient,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}
