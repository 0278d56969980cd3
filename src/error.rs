//! Wacloud Error Types
//!
//! Error handling for the WhatsApp Cloud API client.

use crate::client::diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Provider `(type, code)` pairs that mean "too many requests".
///
/// A `None` type matches any error type carrying the code.
const TOO_MANY_REQUESTS: &[(Option<&str>, i64)] = &[
    (None, 4),
    (Some("OAuthException"), 80004),
    (None, 80007),
    (None, 130429),
    (None, 131056),
];

/// Structured failure reported by the Graph API in an `{"error": {...}}` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    /// Human readable message from the platform
    pub message: String,

    /// Error category, e.g. `OAuthException`
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Numeric error code
    pub code: i64,

    /// Optional subcode
    #[serde(rename = "error_subcode", default, skip_serializing_if = "Option::is_none")]
    pub subcode: Option<i64>,

    /// Trace identifier for support requests
    #[serde(rename = "fbtrace_id", default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// Looked-up explanation and remedy, attached by [`crate::client::diagnostics::enrich`]
    #[serde(skip)]
    pub diagnostic: Option<&'static Diagnostic>,
}

impl ProviderError {
    /// Create a bare provider error with no subcode, trace id or diagnostic
    pub fn new(kind: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: kind.into(),
            code,
            subcode: None,
            trace_id: None,
            diagnostic: None,
        }
    }

    /// Whether this `(type, code)` pair is a rate-limit signal
    pub fn is_too_many_requests(&self) -> bool {
        TOO_MANY_REQUESTS.iter().any(|(kind, code)| {
            *code == self.code && kind.map_or(true, |k| k == self.kind)
        })
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(diagnostic) = self.diagnostic {
            write!(
                f,
                "\nDetails: {}\nSolution: {}",
                diagnostic.message, diagnostic.solution
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {}

/// Main error type for wacloud operations
#[derive(Debug, thiserror::Error)]
pub enum WacloudError {
    /// Configuration errors (missing credentials, invalid policy, bad config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure before any response was received
    #[error("Request failed: {0}")]
    Request(String),

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Response body could not be decoded
    #[error("Response error: {0}")]
    Response(String),

    /// Non-2xx response without a structured provider error
    #[error("Request failed with status {status}: {body}")]
    Http {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },

    /// Structured failure reported by the platform
    #[error("WhatsApp API error (type {}, code {}): {error}", .error.kind, .error.code)]
    Provider {
        status: u16,
        error: ProviderError,
        retry_after: Option<Duration>,
    },

    /// Too-many-requests failure that outlived the retry budget
    #[error("Rate limited after {attempts} attempt(s): {last}")]
    RateLimited {
        attempts: u32,
        last: Box<WacloudError>,
    },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WacloudError {
    /// Whether this failure means the remote quota was exceeded
    pub fn is_too_many_requests(&self) -> bool {
        match self {
            WacloudError::Http { status, .. } => *status == 429,
            WacloudError::Provider { status, error, .. } => {
                *status == 429 || error.is_too_many_requests()
            }
            WacloudError::RateLimited { .. } => true,
            _ => false,
        }
    }

    /// Provider-suggested delay before retrying, if the response carried one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            WacloudError::Http { retry_after, .. } | WacloudError::Provider { retry_after, .. } => {
                *retry_after
            }
            WacloudError::RateLimited { last, .. } => last.retry_after(),
            _ => None,
        }
    }

    /// The structured provider error behind this failure, if any
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            WacloudError::Provider { error, .. } => Some(error),
            WacloudError::RateLimited { last, .. } => last.provider_error(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for WacloudError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WacloudError::Timeout(err.to_string())
        } else if err.is_connect() {
            WacloudError::Request(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            WacloudError::Response(format!("Failed to decode response: {}", err))
        } else {
            WacloudError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WacloudError {
    fn from(err: serde_json::Error) -> Self {
        WacloudError::Response(format!("JSON parsing error: {}", err))
    }
}

impl From<std::io::Error> for WacloudError {
    fn from(err: std::io::Error) -> Self {
        WacloudError::Config(format!("IO error: {}", err))
    }
}

/// Result type alias for wacloud operations
pub type Result<T> = std::result::Result<T, WacloudError>;
