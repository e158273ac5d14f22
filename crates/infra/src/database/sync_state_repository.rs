//! sqlite-backed implementation of the sync state store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use orderbridge_core::SyncStateStore;
use orderbridge_domain::constants::MAX_RECORDED_ERRORS;
use orderbridge_domain::{Result, SyncState};
use rusqlite::{Connection, OptionalExtension, Row};
use tokio::task;
use tracing::warn;

use super::manager::{map_sql_error, DbManager};
use crate::errors::map_join_error;

/// Per-tenant cursor and poll-flag store.
///
/// `begin_poll` is a single conditional UPDATE, so two concurrent cycles for
/// the same tenant cannot both acquire the flag. The cursor update in
/// `finish_poll` takes MAX against the stored value, which keeps it monotone
/// even if a slow cycle finishes after a faster one.
pub struct SqliteSyncStateStore {
    db: Arc<DbManager>,
}

impl SqliteSyncStateStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn ensure_row(conn: &Connection, tenant_id: &str) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO sync_state (tenant_id, cursor, in_progress, last_errors)
             VALUES (?1, 0, 0, '[]')",
            rusqlite::params![tenant_id],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    fn load(conn: &Connection, tenant_id: &str) -> Result<Option<SyncState>> {
        conn.query_row(
            "SELECT tenant_id, cursor, in_progress, last_synced_at, last_errors
             FROM sync_state WHERE tenant_id = ?1",
            rusqlite::params![tenant_id],
            map_state_row,
        )
        .optional()
        .map_err(map_sql_error)
    }
}

#[async_trait]
impl SyncStateStore for SqliteSyncStateStore {
    async fn get_or_create(&self, tenant_id: &str) -> Result<SyncState> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();

        task::spawn_blocking(move || -> Result<SyncState> {
            let conn = db.get_connection()?;
            Self::ensure_row(&conn, &tenant_id)?;
            Self::load(&conn, &tenant_id)?.ok_or_else(|| {
                orderbridge_domain::BridgeError::Database(format!(
                    "sync state for {tenant_id} vanished after insert"
                ))
            })
        })
        .await
        .map_err(map_join_error)?
    }

    async fn begin_poll(&self, tenant_id: &str) -> Result<Option<SyncState>> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();

        task::spawn_blocking(move || -> Result<Option<SyncState>> {
            let conn = db.get_connection()?;
            Self::ensure_row(&conn, &tenant_id)?;

            let acquired = conn
                .execute(
                    "UPDATE sync_state SET in_progress = 1
                     WHERE tenant_id = ?1 AND in_progress = 0",
                    rusqlite::params![tenant_id],
                )
                .map_err(map_sql_error)?;
            if acquired == 0 {
                return Ok(None);
            }

            Self::load(&conn, &tenant_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn finish_poll(
        &self,
        tenant_id: &str,
        cursor: Option<i64>,
        error: Option<&str>,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();
        let error = error.map(String::from);

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;

            if let Some(error) = &error {
                let current: String = conn
                    .query_row(
                        "SELECT last_errors FROM sync_state WHERE tenant_id = ?1",
                        rusqlite::params![tenant_id],
                        |row| row.get(0),
                    )
                    .map_err(map_sql_error)?;
                let mut errors = parse_errors(&tenant_id, &current);
                errors.insert(0, error.clone());
                errors.truncate(MAX_RECORDED_ERRORS);
                let serialized = serde_json::to_string(&errors)
                    .unwrap_or_else(|_| "[]".to_string());
                conn.execute(
                    "UPDATE sync_state SET last_errors = ?2 WHERE tenant_id = ?1",
                    rusqlite::params![tenant_id, serialized],
                )
                .map_err(map_sql_error)?;
            }

            conn.execute(
                "UPDATE sync_state
                 SET in_progress = 0,
                     last_synced_at = ?2,
                     cursor = MAX(cursor, COALESCE(?3, cursor))
                 WHERE tenant_id = ?1",
                rusqlite::params![tenant_id, Utc::now().timestamp(), cursor],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_state_row(row: &Row<'_>) -> rusqlite::Result<SyncState> {
    let tenant_id: String = row.get(0)?;
    let raw_errors: String = row.get(4)?;
    let last_errors = parse_errors(&tenant_id, &raw_errors);

    Ok(SyncState {
        tenant_id,
        cursor: row.get(1)?,
        in_progress: row.get::<_, i64>(2)? != 0,
        last_synced_at: row.get(3)?,
        last_errors,
    })
}

fn parse_errors(tenant_id: &str, raw: &str) -> Vec<String> {
    match serde_json::from_str(raw) {
        Ok(errors) => errors,
        Err(err) => {
            warn!(tenant_id, error = %err, "invalid last_errors column, resetting");
            Vec::new()
        }
    }
}
