//! Provider trait definitions and response types

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other,
}

impl FinishReason {
    /// Map a provider-reported reason string onto the closed set.
    pub fn from_provider(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }
}

/// Classification of outbound provider failures.
///
/// Retry decisions live in the egress client; this enum only names the
/// failure so callers can report it uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Authentication,
    RateLimit,
    InvalidRequest,
    NotFound,
    ServerError,
    ServiceUnavailable,
    Timeout,
    Connection,
    Unknown,
}

impl ProviderErrorKind {
    /// Whether an attempt failing with this kind may be retried.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimit
                | ProviderErrorKind::ServerError
                | ProviderErrorKind::ServiceUnavailable
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::Connection
        )
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderErrorKind::Authentication => "authentication",
            ProviderErrorKind::RateLimit => "rate_limit",
            ProviderErrorKind::InvalidRequest => "invalid_request",
            ProviderErrorKind::NotFound => "not_found",
            ProviderErrorKind::ServerError => "server_error",
            ProviderErrorKind::ServiceUnavailable => "service_unavailable",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::Connection => "connection",
            ProviderErrorKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Optional sampling parameters forwarded to the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub n: Option<u32>,
    pub stop_sequences: Vec<String>,
}

impl CompletionOptions {
    pub fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            ..Default::default()
        }
    }

    /// Canonical string used in cache key derivation. Only set fields
    /// contribute, so requests without sampling overrides share keys.
    pub fn cache_param_string(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(t) = self.temperature {
            parts.push(format!("temperature={t}"));
        }
        if let Some(p) = self.top_p {
            parts.push(format!("top_p={p}"));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(","))
        }
    }
}

/// A completed (non-streaming) provider response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub text: String,
    pub model_id: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency_ms: u64,
    pub finish_reason: FinishReason,
    /// Informational only; never gates success.
    pub estimated_cost: f64,
    pub timestamp: DateTime<Utc>,
}

impl ProviderResponse {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Outbound completion seam.
///
/// The pipeline only ever hands a redacted prompt to implementations of
/// this trait.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send a completion request and wait for the full response.
    async fn complete(
        &self,
        model_id: &str,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<ProviderResponse>;

    /// Whether this provider can serve the given model id.
    fn supports_model(&self, model_id: &str) -> bool;

    /// Provider name for logging and decision records.
    fn name(&self) -> &str;
}
