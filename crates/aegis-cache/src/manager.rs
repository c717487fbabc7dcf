//! Cache manager: read-through across both tiers
//!
//! Read: tier-1 first; on miss consult tier-2 and promote a hit into
//! tier-1 before returning. Write: both tiers. Evict/clear: both tiers,
//! tier-2 scoped to the configured key prefix.

use crate::key::CacheKeyGenerator;
use crate::tier1::{TierOne, TierOneStats};
use crate::tier2::RemoteCache;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedStats {
    pub tier1: TierOneStats,
    pub tier2_hits: u64,
    pub tier2_misses: u64,
    pub tier2_enabled: bool,
    /// (t1 hits + t2 hits) / t1 total requests. Tier-2 lookups are
    /// internal to the read path, so they do not widen the denominator.
    pub overall_hit_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealth {
    pub tier1_ok: bool,
    /// `None` when tier-2 is disabled.
    pub tier2_ok: Option<bool>,
}

pub struct CacheManager {
    keygen: CacheKeyGenerator,
    tier1: TierOne,
    tier2: Arc<dyn RemoteCache>,
    tier2_hits: AtomicU64,
    tier2_misses: AtomicU64,
}

impl CacheManager {
    pub fn new(keygen: CacheKeyGenerator, tier1: TierOne, tier2: Arc<dyn RemoteCache>) -> Self {
        Self {
            keygen,
            tier1,
            tier2,
            tier2_hits: AtomicU64::new(0),
            tier2_misses: AtomicU64::new(0),
        }
    }

    pub fn key_for(&self, prompt: &str, model_id: &str, params: Option<&str>) -> String {
        self.keygen.generate(prompt, model_id, params)
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.tier1.get(key) {
            debug!(key, "Cache hit (tier-1)");
            return Some(value);
        }

        if self.tier2.is_enabled() {
            if let Some(value) = self.tier2.get(key).await {
                self.tier2_hits.fetch_add(1, Ordering::Relaxed);
                // Promote for the next reader on this instance
                self.tier1.put(key, &value);
                debug!(key, "Cache hit (tier-2, promoted)");
                return Some(value);
            }
            self.tier2_misses.fetch_add(1, Ordering::Relaxed);
        }

        debug!(key, "Cache miss");
        None
    }

    pub async fn put(&self, key: &str, value: &str) {
        self.tier1.put(key, value);
        self.tier2.put(key, value).await;
    }

    pub async fn evict(&self, key: &str) {
        self.tier1.evict(key);
        self.tier2.evict(key).await;
    }

    pub async fn clear(&self) {
        self.tier1.clear();
        self.tier2.clear_prefix(self.keygen.prefix()).await;
    }

    pub fn stats(&self) -> CombinedStats {
        let tier1 = self.tier1.stats();
        let tier2_hits = self.tier2_hits.load(Ordering::Relaxed);
        let t1_total = tier1.hits + tier1.misses;
        let overall_hit_rate = if t1_total == 0 {
            0.0
        } else {
            (tier1.hits + tier2_hits) as f64 / t1_total as f64
        };
        CombinedStats {
            tier1,
            tier2_hits,
            tier2_misses: self.tier2_misses.load(Ordering::Relaxed),
            tier2_enabled: self.tier2.is_enabled(),
            overall_hit_rate,
        }
    }

    /// Write-read-delete cycle per tier; tier-2 is skipped when disabled.
    pub async fn health(&self) -> CacheHealth {
        let probe = "llm:health:t1-probe";
        self.tier1.put(probe, "ok");
        let tier1_ok = self.tier1.get(probe).as_deref() == Some("ok");
        self.tier1.evict(probe);

        CacheHealth {
            tier1_ok,
            tier2_ok: self.tier2.health_check().await,
        }
    }
}
