//! Shared HTTP client utilities

use crate::{EgressError, Result};
use rand::Rng;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-attempt request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Maximum number of idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Additional retry attempts after the first (total attempts = max_retries + 1)
    pub max_retries: u32,

    /// Base backoff delay between retries in milliseconds
    pub retry_delay_ms: u64,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 32,
            max_retries: 3,
            retry_delay_ms: 200,
            user_agent: format!("Aegis/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a configured HTTP client with connection pooling
pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .build()
        .map_err(|e| EgressError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Backoff before retry `attempt` (0-based): `base * 2^attempt` plus a
/// uniform jitter in `[0, base)`.
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exponential = base_ms.saturating_mul(1u64 << attempt.min(16));
    let jitter = if base_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..base_ms)
    };
    Duration::from_millis(exponential + jitter)
}

/// Retry policy for transient errors. Runs the operation up to
/// `max_retries + 1` times, sleeping between attempts; non-retryable
/// errors and the final failure surface immediately.
pub async fn with_retry<F, Fut, T>(max_retries: u32, base_delay_ms: u64, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(base_delay_ms, attempt - 1);
            debug!(
                delay_ms = delay.as_millis() as u64,
                attempt,
                max_retries,
                "Retrying provider call"
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if e.is_retryable() && attempt < max_retries {
                    warn!(
                        attempt = attempt + 1,
                        total = max_retries + 1,
                        error = %e,
                        "Provider call failed, will retry"
                    );
                    last_error = Some(e);
                } else {
                    return Err(e);
                }
            }
        }
    }

    // Unreachable in practice: the loop returns on success or on the
    // final stored error, but don't panic if the budget was zero.
    Err(last_error
        .unwrap_or_else(|| EgressError::Config("Retry loop exited unexpectedly".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_ms, 200);
        assert!(config.user_agent.starts_with("Aegis/"));
    }

    #[test]
    fn test_create_client() {
        assert!(create_client(&HttpClientConfig::default()).is_ok());
    }

    #[test]
    fn test_backoff_grows_exponentially_with_jitter() {
        for attempt in 0..4 {
            let delay = backoff_delay(100, attempt).as_millis() as u64;
            let floor = 100 * (1 << attempt);
            assert!(delay >= floor, "attempt {attempt}: {delay} < {floor}");
            assert!(delay < floor + 100, "attempt {attempt}: {delay} over jitter cap");
        }
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let result = with_retry(3, 1, || async { Ok::<i32, EgressError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(3, 1, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<i32, EgressError>(EgressError::Provider {
                    status: 401,
                    message: "bad key".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(2, 1, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<i32, EgressError>(EgressError::Provider {
                    status: 503,
                    message: "down".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        // max_retries + 1 total attempts
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retryable_then_success() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(3, 1, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(EgressError::Provider {
                        status: 429,
                        message: "rate limited".into(),
                    })
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
