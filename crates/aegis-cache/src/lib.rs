//! Aegis Two-Tier Response Cache
//!
//! A small in-process tier (LRU + TTL) fronts a shared network tier with
//! read-through promotion and write-through. The cache is never the source
//! of truth: any tier-2 failure degrades to a miss and a request must
//! never fail because the cache did.

pub mod key;
pub mod manager;
pub mod tier1;
pub mod tier2;

pub use key::CacheKeyGenerator;
pub use manager::{CacheHealth, CacheManager, CombinedStats};
pub use tier1::{TierOne, TierOneConfig, TierOneStats};
pub use tier2::{DisabledTier, RedisTier, RemoteCache, TierTwoConfig};
