//! Aegis Egress Connectors
//!
//! Outbound calls to LLM providers: error classification into a closed
//! kind set, exponential backoff with jitter, and a per-attempt deadline.

use aegis_core::ProviderErrorKind;
use thiserror::Error;

pub mod client;
pub mod openai;

/// Egress-specific errors
#[derive(Debug, Error)]
pub enum EgressError {
    /// Transport-level failure from the HTTP client
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned a non-success status
    #[error("Provider error {status}: {message}")]
    Provider { status: u16, message: String },

    /// Response body did not match the expected wire shape
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Per-attempt deadline elapsed
    #[error("Request timeout after {0}s")]
    Timeout(u64),

    /// Request rejected locally before any network I/O
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EgressError {
    /// Classify into the gateway-wide provider error kinds.
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            EgressError::Http(e) => {
                if e.is_timeout() {
                    ProviderErrorKind::Timeout
                } else if e.is_connect() || e.is_request() {
                    ProviderErrorKind::Connection
                } else {
                    ProviderErrorKind::Unknown
                }
            }
            EgressError::Provider { status, .. } => match status {
                401 | 403 => ProviderErrorKind::Authentication,
                429 => ProviderErrorKind::RateLimit,
                400 => ProviderErrorKind::InvalidRequest,
                404 => ProviderErrorKind::NotFound,
                500 => ProviderErrorKind::ServerError,
                502 | 503 | 504 => ProviderErrorKind::ServiceUnavailable,
                _ => ProviderErrorKind::Unknown,
            },
            EgressError::Timeout(_) => ProviderErrorKind::Timeout,
            EgressError::InvalidRequest(_) => ProviderErrorKind::InvalidRequest,
            EgressError::Parse(_) | EgressError::Config(_) => ProviderErrorKind::Unknown,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Egress result type
pub type Result<T> = std::result::Result<T, EgressError>;

impl From<EgressError> for aegis_core::Error {
    fn from(err: EgressError) -> Self {
        aegis_core::Error::Provider {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
