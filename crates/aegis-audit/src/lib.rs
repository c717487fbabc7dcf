//! Aegis Audit Persistence
//!
//! Persists one record per sensitive-value detection: kind, token and
//! original length, never the original value. Writes are fire-and-forget
//! through a bounded queue so the request path is never blocked, and a
//! scheduled sweep enforces the retention policy.

pub mod retention;
pub mod sink;
pub mod store;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use retention::spawn_retention_sweep;
pub use sink::AuditSink;
pub use store::{AuditError, AuditRecord, AuditStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    /// Kind, token and length only.
    #[default]
    Standard,
    /// Additionally records the match positions.
    Detailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub level: AuditLevel,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> u32 {
    90
}

fn default_db_path() -> PathBuf {
    PathBuf::from("aegis-audit.db")
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: AuditLevel::Standard,
            retention_days: default_retention_days(),
            db_path: default_db_path(),
        }
    }
}
