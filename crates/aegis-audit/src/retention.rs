//! Scheduled retention sweep

use crate::store::AuditStore;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Periodically delete audit records older than `retention_days`.
///
/// The first tick fires after one full interval, so startup is never
/// burdened with a sweep.
pub fn spawn_retention_sweep(
    store: Arc<AuditStore>,
    retention_days: u32,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // completes immediately

        loop {
            ticker.tick().await;
            let cutoff = Utc::now() - ChronoDuration::days(retention_days as i64);
            match store.delete_older_than(cutoff).await {
                Ok(0) => info!("Audit retention sweep: nothing to delete"),
                Ok(deleted) => info!(deleted, retention_days, "Audit retention sweep complete"),
                Err(e) => error!(error = %e, "Audit retention sweep failed"),
            }
        }
    })
}
