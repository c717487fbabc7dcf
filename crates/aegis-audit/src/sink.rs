//! Fire-and-forget audit sink
//!
//! A bounded submission queue feeds a dedicated writer task. Submission
//! never blocks the request path: when the queue is full the batch is
//! dropped with a warning.

use crate::store::{AuditRecord, AuditStore};
use crate::{AuditConfig, AuditLevel};
use aegis_pii::SvContext;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

const DEFAULT_QUEUE_DEPTH: usize = 256;

struct AuditJob {
    request_id: String,
    records: Vec<AuditRecord>,
}

#[derive(Clone)]
pub struct AuditSink {
    tx: Option<mpsc::Sender<AuditJob>>,
    level: AuditLevel,
}

impl AuditSink {
    /// Spawn the writer task and return the submission handle.
    pub fn spawn(store: Arc<AuditStore>, config: &AuditConfig) -> Self {
        Self::spawn_with_depth(store, config, DEFAULT_QUEUE_DEPTH)
    }

    pub fn spawn_with_depth(
        store: Arc<AuditStore>,
        config: &AuditConfig,
        queue_depth: usize,
    ) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let (tx, mut rx) = mpsc::channel::<AuditJob>(queue_depth);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(e) = store.record_batch(&job.records).await {
                    // Audit failures never affect the user-facing response
                    error!(request_id = %job.request_id, error = %e, "Audit write failed");
                } else {
                    debug!(
                        request_id = %job.request_id,
                        count = job.records.len(),
                        "Audit batch persisted"
                    );
                }
            }
        });

        Self {
            tx: Some(tx),
            level: config.level,
        }
    }

    /// Sink that accepts and discards everything (audit disabled).
    pub fn disabled() -> Self {
        Self {
            tx: None,
            level: AuditLevel::Standard,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue the context's detections for persistence. Non-blocking;
    /// overflow drops the batch with a warning.
    pub fn submit(&self, ctx: &SvContext) {
        let Some(tx) = &self.tx else {
            return;
        };
        if !ctx.has_detections() {
            return;
        }

        let request_id = ctx.request_id().to_string();
        let records: Vec<AuditRecord> = ctx
            .detections()
            .into_iter()
            .map(|d| AuditRecord {
                id: None,
                request_id: request_id.clone(),
                kind: d.kind,
                token: d.token,
                original_length: d.original_length as i64,
                action: "REDACTED".to_string(),
                position_start: match self.level {
                    AuditLevel::Detailed => d.position.map(|(s, _)| s as i64),
                    AuditLevel::Standard => None,
                },
                position_end: match self.level {
                    AuditLevel::Detailed => d.position.map(|(_, e)| e as i64),
                    AuditLevel::Standard => None,
                },
                created_at: d.detected_at,
            })
            .collect();

        let job = AuditJob {
            request_id: request_id.clone(),
            records,
        };
        if let Err(e) = tx.try_send(job) {
            warn!(request_id = %request_id, error = %e, "Audit queue full, dropping batch");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn context_with_detections(n: usize) -> SvContext {
        let ctx = SvContext::new(Uuid::new_v4());
        for i in 0..n {
            ctx.add_mapping(
                format!("[EMAIL_TOKEN_{i:06x}]"),
                format!("user{i}@example.org"),
                "EMAIL",
                Some((i * 30, i * 30 + 17)),
            );
        }
        ctx
    }

    async fn wait_for_count(store: &AuditStore, expected: i64) {
        for _ in 0..50 {
            if store.total_count().await.unwrap() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("audit store never reached {expected} records");
    }

    #[tokio::test]
    async fn test_submit_persists_one_record_per_detection() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(AuditStore::new(&dir.path().join("a.db")).await.unwrap());
        let sink = AuditSink::spawn(store.clone(), &AuditConfig::default());

        let ctx = context_with_detections(3);
        sink.submit(&ctx);

        wait_for_count(&store, 3).await;
        let records = store
            .find_by_request(&ctx.request_id().to_string())
            .await
            .unwrap();
        assert_eq!(records.len(), 3);
        // Standard level: no positions persisted
        assert!(records.iter().all(|r| r.position_start.is_none()));
        // Never the original value
        assert!(records.iter().all(|r| !r.token.contains("example.org")));
    }

    #[tokio::test]
    async fn test_detailed_level_keeps_positions() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(AuditStore::new(&dir.path().join("a.db")).await.unwrap());
        let config = AuditConfig {
            level: AuditLevel::Detailed,
            ..Default::default()
        };
        let sink = AuditSink::spawn(store.clone(), &config);

        let ctx = context_with_detections(1);
        sink.submit(&ctx);

        wait_for_count(&store, 1).await;
        let records = store
            .find_by_request(&ctx.request_id().to_string())
            .await
            .unwrap();
        assert_eq!(records[0].position_start, Some(0));
        assert_eq!(records[0].position_end, Some(17));
    }

    #[tokio::test]
    async fn test_disabled_sink_discards() {
        let sink = AuditSink::disabled();
        assert!(!sink.is_enabled());
        // Must not panic or block
        sink.submit(&context_with_detections(2));
    }

    #[tokio::test]
    async fn test_empty_context_not_submitted() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(AuditStore::new(&dir.path().join("a.db")).await.unwrap());
        let sink = AuditSink::spawn(store.clone(), &AuditConfig::default());

        sink.submit(&SvContext::new(Uuid::new_v4()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.total_count().await.unwrap(), 0);
    }
}
