//! Error types for the FarmLink client

use thiserror::Error;

/// Result type alias for the FarmLink client
pub type Result<T> = std::result::Result<T, Error>;

/// FarmLink client errors
///
/// The enum is `Clone`: a de-duplicated in-flight request settles once and
/// its result — success or failure — is handed to every joined caller.
/// Transport and decode failures therefore carry their source rendered as a
/// string rather than the non-cloneable source error itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport error (connectivity, DNS, TLS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request exceeded the watchdog timeout and was aborted
    #[error("Request timed out after {timeout_secs}s: {endpoint}")]
    Timeout {
        /// Endpoint the aborted request was addressed to
        endpoint: String,
        /// The watchdog timeout that fired, in seconds
        timeout_secs: u64,
    },

    /// Non-2xx HTTP response
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// Successful response carried a body that was not valid JSON
    #[error("Response decode error: {0}")]
    Decode(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an HTTP-status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// `true` when this is the watchdog cancellation error — callers use
    /// this to show "request timed out" instead of a generic failure
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// `true` when this is an HTTP 401 response
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// HTTP status code, when this error carries one
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
