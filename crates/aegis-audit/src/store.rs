//! SQLite audit store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use sqlx::Row;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for AuditError {
    fn from(e: sqlx::Error) -> Self {
        AuditError::Database(e.to_string())
    }
}

/// One persisted detection. Carries no original value, only its length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Option<i64>,
    pub request_id: String,
    pub kind: String,
    pub token: String,
    pub original_length: i64,
    pub action: String,
    pub position_start: Option<i64>,
    pub position_end: Option<i64>,
    pub created_at: DateTime<Utc>,
}

pub struct AuditStore {
    pool: SqlitePool,
}

impl AuditStore {
    pub async fn new(db_path: &Path) -> Result<Self, AuditError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal),
            )
            .await?;

        Self::initialize_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn initialize_schema(pool: &SqlitePool) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sv_audit (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                token TEXT NOT NULL,
                original_length INTEGER NOT NULL,
                action TEXT NOT NULL DEFAULT 'REDACTED',
                position_start INTEGER,
                position_end INTEGER,
                created_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sv_audit_request ON sv_audit(request_id)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sv_audit_kind ON sv_audit(kind, created_at DESC)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sv_audit_created ON sv_audit(created_at DESC)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Insert a request's records in one transaction.
    pub async fn record_batch(&self, records: &[AuditRecord]) -> Result<(), AuditError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO sv_audit
                    (request_id, kind, token, original_length, action,
                     position_start, position_end, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.request_id)
            .bind(&record.kind)
            .bind(&record.token)
            .bind(record.original_length)
            .bind(&record.action)
            .bind(record.position_start)
            .bind(record.position_end)
            .bind(record.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::debug!(count = records.len(), "Persisted audit batch");
        Ok(())
    }

    pub async fn find_by_request(&self, request_id: &str) -> Result<Vec<AuditRecord>, AuditError> {
        let rows = sqlx::query(
            r#"
            SELECT id, request_id, kind, token, original_length, action,
                   position_start, position_end, created_at
            FROM sv_audit WHERE request_id = ? ORDER BY id
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| row_to_record(&row)).collect()
    }

    /// Detection counts grouped by kind, most frequent first.
    pub async fn counts_by_kind(&self) -> Result<Vec<(String, i64)>, AuditError> {
        let rows = sqlx::query(
            "SELECT kind, COUNT(*) AS n FROM sv_audit GROUP BY kind ORDER BY n DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>("kind"), row.get::<i64, _>("n")))
            .collect())
    }

    pub async fn count_since(&self, cutoff: DateTime<Utc>) -> Result<i64, AuditError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sv_audit WHERE created_at >= ?")
                .bind(cutoff)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn total_count(&self) -> Result<i64, AuditError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sv_audit")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Delete records older than the cutoff; returns how many went away.
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditError> {
        let result = sqlx::query("DELETE FROM sv_audit WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<AuditRecord, AuditError> {
    Ok(AuditRecord {
        id: Some(row.get("id")),
        request_id: row.get("request_id"),
        kind: row.get("kind"),
        token: row.get("token"),
        original_length: row.get("original_length"),
        action: row.get("action"),
        position_start: row.get("position_start"),
        position_end: row.get("position_end"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn record(request_id: &str, kind: &str, age_days: i64) -> AuditRecord {
        AuditRecord {
            id: None,
            request_id: request_id.to_string(),
            kind: kind.to_string(),
            token: format!("[{kind}_TOKEN_abc123]"),
            original_length: 16,
            action: "REDACTED".to_string(),
            position_start: None,
            position_end: None,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    async fn store(dir: &TempDir) -> AuditStore {
        AuditStore::new(&dir.path().join("audit.db")).await.unwrap()
    }

    #[tokio::test]
    async fn test_batch_insert_and_query() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let records = vec![
            record("req-1", "EMAIL", 0),
            record("req-1", "PHONE", 0),
            record("req-2", "EMAIL", 0),
        ];
        store.record_batch(&records).await.unwrap();

        let found = store.find_by_request("req-1").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.request_id == "req-1"));
        assert!(found.iter().all(|r| r.action == "REDACTED"));
        assert_eq!(store.total_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_counts_by_kind() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        store
            .record_batch(&[
                record("r1", "EMAIL", 0),
                record("r2", "EMAIL", 0),
                record("r3", "PHONE", 0),
            ])
            .await
            .unwrap();

        let counts = store.counts_by_kind().await.unwrap();
        assert_eq!(counts[0], ("EMAIL".to_string(), 2));
        assert_eq!(counts[1], ("PHONE".to_string(), 1));
    }

    #[tokio::test]
    async fn test_retention_deletes_only_old_rows() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        store
            .record_batch(&[
                record("old", "EMAIL", 120),
                record("old", "PHONE", 91),
                record("fresh", "EMAIL", 1),
            ])
            .await
            .unwrap();

        let cutoff = Utc::now() - Duration::days(90);
        let deleted = store.delete_older_than(cutoff).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.total_count().await.unwrap(), 1);
        assert_eq!(store.find_by_request("fresh").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_count_since() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        store
            .record_batch(&[record("a", "EMAIL", 10), record("b", "EMAIL", 1)])
            .await
            .unwrap();

        let since = Utc::now() - Duration::days(5);
        assert_eq!(store.count_since(since).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.record_batch(&[]).await.unwrap();
        assert_eq!(store.total_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_positions_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let mut r = record("req-pos", "EMAIL", 0);
        r.position_start = Some(14);
        r.position_end = Some(34);
        store.record_batch(&[r]).await.unwrap();

        let found = store.find_by_request("req-pos").await.unwrap();
        assert_eq!(found[0].position_start, Some(14));
        assert_eq!(found[0].position_end, Some(34));
    }
}
