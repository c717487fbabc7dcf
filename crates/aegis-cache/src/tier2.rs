//! Tier-2: shared network cache
//!
//! A Redis-backed key-value tier with per-entry TTL. Every operation is
//! wrapped so that an outage degrades to a miss (reads) or a silent drop
//! (writes); the request path never sees a tier-2 error. A disabled tier
//! is a no-op that always misses.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierTwoConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_ttl_minutes() -> u64 {
    24 * 60
}

fn default_key_prefix() -> String {
    "llm".to_string()
}

impl Default for TierTwoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_url(),
            ttl_minutes: default_ttl_minutes(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// Network cache seam. Implementations swallow their own I/O failures.
#[async_trait]
pub trait RemoteCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn put(&self, key: &str, value: &str);

    async fn evict(&self, key: &str);

    /// Remove every key under the given prefix. Scoped so a shared
    /// instance only loses this service's entries.
    async fn clear_prefix(&self, prefix: &str);

    /// Write-read-delete probe. `None` when the tier is disabled.
    async fn health_check(&self) -> Option<bool>;

    fn is_enabled(&self) -> bool;
}

/// No-op tier used when tier-2 is configured off.
#[derive(Debug, Default)]
pub struct DisabledTier;

#[async_trait]
impl RemoteCache for DisabledTier {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn put(&self, _key: &str, _value: &str) {}

    async fn evict(&self, _key: &str) {}

    async fn clear_prefix(&self, _prefix: &str) {}

    async fn health_check(&self) -> Option<bool> {
        None
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

pub struct RedisTier {
    connection: ConnectionManager,
    ttl: Duration,
}

impl RedisTier {
    /// Connect to Redis. Startup failures surface here so the caller can
    /// fall back to a [`DisabledTier`]; once connected, the manager
    /// reconnects on its own.
    pub async fn connect(config: &TierTwoConfig) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(config.url.as_str())?;
        let connection = ConnectionManager::new(client).await?;
        debug!(url = %config.url, "Connected to tier-2 cache");
        Ok(Self {
            connection,
            ttl: Duration::from_secs(config.ttl_minutes * 60),
        })
    }
}

#[async_trait]
impl RemoteCache for RedisTier {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connection.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Tier-2 read failed, treating as miss");
                None
            }
        }
    }

    async fn put(&self, key: &str, value: &str) {
        let mut conn = self.connection.clone();
        let ttl_secs = self.ttl.as_secs();
        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            warn!(key, error = %e, "Tier-2 write failed, dropping entry");
        }
    }

    async fn evict(&self, key: &str) {
        let mut conn = self.connection.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            warn!(key, error = %e, "Tier-2 delete failed");
        }
    }

    async fn clear_prefix(&self, prefix: &str) {
        let pattern = format!("{prefix}:*");
        let mut scan_conn = self.connection.clone();
        let keys: Vec<String> = {
            match scan_conn.scan_match::<_, String>(&pattern).await {
                Ok(mut iter) => {
                    let mut keys = Vec::new();
                    while let Some(key) = iter.next_item().await {
                        keys.push(key);
                    }
                    keys
                }
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Tier-2 scan failed, skipping clear");
                    return;
                }
            }
        };

        if keys.is_empty() {
            return;
        }
        let mut conn = self.connection.clone();
        if let Err(e) = conn.del::<_, ()>(&keys).await {
            warn!(count = keys.len(), error = %e, "Tier-2 bulk delete failed");
        } else {
            debug!(count = keys.len(), "Cleared tier-2 keys");
        }
    }

    async fn health_check(&self) -> Option<bool> {
        let probe_key = "llm:health:probe";
        let mut conn = self.connection.clone();

        let ok = conn
            .set_ex::<_, _, ()>(probe_key, "ok", 10)
            .await
            .is_ok()
            && conn.get::<_, Option<String>>(probe_key).await.ok().flatten().as_deref()
                == Some("ok")
            && conn.del::<_, ()>(probe_key).await.is_ok();
        Some(ok)
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_tier_is_a_noop() {
        let tier = DisabledTier;
        tier.put("llm:abc", "value").await;
        assert_eq!(tier.get("llm:abc").await, None);
        assert_eq!(tier.health_check().await, None);
        assert!(!tier.is_enabled());
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_redis_fails_fast() {
        let config = TierTwoConfig {
            enabled: true,
            url: "redis://127.0.0.1:1".to_string(),
            ttl_minutes: 1,
            key_prefix: "llm".to_string(),
        };
        assert!(RedisTier::connect(&config).await.is_err());
    }
}
