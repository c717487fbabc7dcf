//! Tier-1: bounded in-process cache
//!
//! LRU by recency of use, expires-after-write, with hit/miss/eviction
//! counters. Entry mutations are serialized by the underlying cache while
//! reads stay concurrent.

use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierOneConfig {
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,
}

fn default_max_size() -> u64 {
    1000
}

fn default_ttl_minutes() -> u64 {
    60
}

impl Default for TierOneConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierOneStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: u64,
}

impl TierOneStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct TierOne {
    entries: Cache<String, String>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: Arc<AtomicU64>,
}

impl TierOne {
    pub fn from_config(config: &TierOneConfig) -> Self {
        Self::new(
            config.max_size,
            Duration::from_secs(config.ttl_minutes * 60),
        )
    }

    pub fn new(max_size: u64, ttl: Duration) -> Self {
        let evictions = Arc::new(AtomicU64::new(0));
        let listener_evictions = Arc::clone(&evictions);
        let entries = Cache::builder()
            .max_capacity(max_size)
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |_key, _value, cause| {
                if matches!(cause, RemovalCause::Size | RemovalCause::Expired) {
                    listener_evictions.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();
        Self {
            entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn evict(&self, key: &str) {
        self.entries.invalidate(key);
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    pub fn stats(&self) -> TierOneStats {
        self.entries.run_pending_tasks();
        TierOneStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.entries.entry_count(),
        }
    }
}

impl std::fmt::Debug for TierOne {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierOne")
            .field("size", &self.entries.entry_count())
            .finish()
    }
}
