//! sqlite-backed implementation of the event queue port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use orderbridge_core::EventQueue;
use orderbridge_domain::{EventKind, QueueItem, QueueItemStatus, Result};
use rusqlite::{Connection, Row};
use tokio::task;
use tracing::warn;

use super::manager::{map_sql_error, DbManager};
use crate::errors::map_join_error;

/// Durable event queue on the shared sqlite pool.
///
/// `(tenant_id, source_event_id)` carries a UNIQUE constraint; enqueue is an
/// `INSERT OR IGNORE`, which is what gives the pipeline its dedup guarantee.
pub struct SqliteEventQueue {
    db: Arc<DbManager>,
}

impl SqliteEventQueue {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn insert_item(conn: &Connection, item: &QueueItem) -> Result<bool> {
        let payload = item.payload.to_string();
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO sync_queue (
                    id, tenant_id, source_event_id, kind, related_order_id, payload,
                    status, retry_count, last_error, created_at, processed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    item.id,
                    item.tenant_id,
                    item.source_event_id,
                    item.kind.wire_name(),
                    item.related_order_id,
                    payload,
                    item.status.to_string(),
                    item.retry_count,
                    item.last_error,
                    item.created_at,
                    item.processed_at,
                ],
            )
            .map_err(map_sql_error)?;
        Ok(changed > 0)
    }
}

#[async_trait]
impl EventQueue for SqliteEventQueue {
    async fn enqueue(&self, item: &QueueItem) -> Result<bool> {
        let db = Arc::clone(&self.db);
        let item = item.clone();

        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            Self::insert_item(&conn, &item)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn fetch_pending(&self, limit: usize) -> Result<Vec<QueueItem>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Vec<QueueItem>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, tenant_id, source_event_id, kind, related_order_id, payload,
                            status, retry_count, last_error, created_at, processed_at
                     FROM sync_queue
                     WHERE status = 'pending'
                     ORDER BY created_at ASC, id ASC
                     LIMIT ?1",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map([limit_to_i64(limit)], map_queue_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_processing(&self, id: &str) -> Result<bool> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<bool> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE sync_queue SET status = 'processing', picked_at = ?2
                     WHERE id = ?1 AND status = 'pending'",
                    rusqlite::params![id, Utc::now().timestamp()],
                )
                .map_err(map_sql_error)?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_completed(&self, id: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE sync_queue SET status = 'completed', processed_at = ?2 WHERE id = ?1",
                rusqlite::params![id, Utc::now().timestamp()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_retry(&self, id: &str, error: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        let error = error.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE sync_queue
                 SET status = 'pending', retry_count = retry_count + 1, last_error = ?2
                 WHERE id = ?1",
                rusqlite::params![id, error],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        let error = error.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE sync_queue
                 SET status = 'failed', last_error = ?2, processed_at = ?3
                 WHERE id = ?1",
                rusqlite::params![id, error, Utc::now().timestamp()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn requeue_stale(&self, older_than_secs: i64) -> Result<usize> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<usize> {
            let conn = db.get_connection()?;
            let cutoff = Utc::now().timestamp() - older_than_secs;
            let changed = conn
                .execute(
                    "UPDATE sync_queue SET status = 'pending'
                     WHERE status = 'processing' AND picked_at < ?1",
                    rusqlite::params![cutoff],
                )
                .map_err(map_sql_error)?;
            Ok(changed)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, tenant_id: &str, source_event_id: &str) -> Result<Option<QueueItem>> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();
        let source_event_id = source_event_id.to_string();

        task::spawn_blocking(move || -> Result<Option<QueueItem>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, tenant_id, source_event_id, kind, related_order_id, payload,
                            status, retry_count, last_error, created_at, processed_at
                     FROM sync_queue
                     WHERE tenant_id = ?1 AND source_event_id = ?2",
                )
                .map_err(map_sql_error)?;
            let mut rows = stmt
                .query_map(rusqlite::params![tenant_id, source_event_id], map_queue_row)
                .map_err(map_sql_error)?;
            rows.next().transpose().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_queue_row(row: &Row<'_>) -> rusqlite::Result<QueueItem> {
    let id: String = row.get(0)?;
    let kind_raw: String = row.get(3)?;
    let payload_raw: String = row.get(5)?;
    let status_raw: String = row.get(6)?;

    let payload = serde_json::from_str(&payload_raw).unwrap_or(serde_json::Value::Null);
    let status = parse_status(&id, &status_raw);

    Ok(QueueItem {
        id,
        tenant_id: row.get(1)?,
        source_event_id: row.get(2)?,
        kind: EventKind::from(kind_raw),
        related_order_id: row.get(4)?,
        payload,
        status,
        retry_count: row.get(7)?,
        last_error: row.get(8)?,
        created_at: row.get(9)?,
        processed_at: row.get(10)?,
    })
}

fn parse_status(id: &str, raw: &str) -> QueueItemStatus {
    match raw.parse::<QueueItemStatus>() {
        Ok(status) => status,
        Err(err) => {
            warn!(
                item_id = %id,
                raw_status = %raw,
                error = %err,
                "invalid queue status in sqlite, defaulting to pending"
            );
            QueueItemStatus::Pending
        }
    }
}

fn limit_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
