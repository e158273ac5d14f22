//! sqlite-backed implementation of the stock ledger port.

use std::sync::Arc;

use async_trait::async_trait;
use orderbridge_core::StockLedger;
use orderbridge_domain::{Result, StockLedgerEntry};
use tokio::task;

use super::manager::{map_sql_error, DbManager};
use crate::errors::map_join_error;

pub struct SqliteStockLedger {
    db: Arc<DbManager>,
}

impl SqliteStockLedger {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StockLedger for SqliteStockLedger {
    async fn record(&self, entry: &StockLedgerEntry) -> Result<()> {
        let db = Arc::clone(&self.db);
        let entry = entry.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO stock_ledger (
                    id, tenant_id, remote_product_id, delta, reason, recorded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    entry.id,
                    entry.tenant_id,
                    entry.remote_product_id,
                    entry.delta,
                    entry.reason,
                    entry.recorded_at,
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn recorded_level(&self, tenant_id: &str, remote_product_id: &str) -> Result<i64> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();
        let remote_product_id = remote_product_id.to_string();

        task::spawn_blocking(move || -> Result<i64> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT COALESCE(SUM(delta), 0) FROM stock_ledger
                 WHERE tenant_id = ?1 AND remote_product_id = ?2",
                rusqlite::params![tenant_id, remote_product_id],
                |row| row.get(0),
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}
