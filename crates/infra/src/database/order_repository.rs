//! sqlite-backed implementation of the order repository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use orderbridge_core::OrderRepository;
use orderbridge_domain::{Order, OrderLineItem, OrderStatus, Result};
use rusqlite::{Connection, OptionalExtension, Row};
use tokio::task;
use tracing::warn;

use super::manager::{map_sql_error, DbManager};
use crate::errors::map_join_error;

pub struct SqliteOrderRepository {
    db: Arc<DbManager>,
}

impl SqliteOrderRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn insert_tx(conn: &mut Connection, order: &Order, lines: &[OrderLineItem]) -> Result<()> {
        let tx = conn.transaction().map_err(map_sql_error)?;
        tx.execute(
            "INSERT INTO orders (
                id, tenant_id, remote_order_id, client_id, status, total_cents,
                paid_cents, currency, invoice_number, tracking_number, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                order.id,
                order.tenant_id,
                order.remote_order_id,
                order.client_id,
                order.status.to_string(),
                order.total_cents,
                order.paid_cents,
                order.currency,
                order.invoice_number,
                order.tracking_number,
                order.created_at,
                order.updated_at,
            ],
        )
        .map_err(map_sql_error)?;

        for line in lines {
            tx.execute(
                "INSERT INTO order_line_items (
                    id, order_id, remote_product_id, name, quantity, unit_price_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    line.id,
                    line.order_id,
                    line.remote_product_id,
                    line.name,
                    line.quantity,
                    line.unit_price_cents,
                ],
            )
            .map_err(map_sql_error)?;
        }

        tx.commit().map_err(map_sql_error)
    }

    async fn update_column(&self, order_id: &str, sql: &'static str, value: String) -> Result<()> {
        let db = Arc::clone(&self.db);
        let order_id = order_id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(sql, rusqlite::params![order_id, value, Utc::now().timestamp()])
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn find_by_remote_id(
        &self,
        tenant_id: &str,
        remote_order_id: &str,
    ) -> Result<Option<Order>> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();
        let remote_order_id = remote_order_id.to_string();

        task::spawn_blocking(move || -> Result<Option<Order>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT id, tenant_id, remote_order_id, client_id, status, total_cents,
                        paid_cents, currency, invoice_number, tracking_number, created_at,
                        updated_at
                 FROM orders WHERE tenant_id = ?1 AND remote_order_id = ?2",
                rusqlite::params![tenant_id, remote_order_id],
                map_order_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert(&self, order: &Order, lines: &[OrderLineItem]) -> Result<()> {
        let db = Arc::clone(&self.db);
        let order = order.clone();
        let lines = lines.to_vec();

        task::spawn_blocking(move || -> Result<()> {
            let mut conn = db.get_connection()?;
            Self::insert_tx(&mut conn, &order, &lines)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
        self.update_column(
            order_id,
            "UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1",
            status.to_string(),
        )
        .await
    }

    async fn record_payment(&self, order_id: &str, paid_cents: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        let order_id = order_id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE orders SET paid_cents = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![order_id, paid_cents, Utc::now().timestamp()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_invoice_number(&self, order_id: &str, invoice_number: &str) -> Result<()> {
        self.update_column(
            order_id,
            "UPDATE orders SET invoice_number = ?2, updated_at = ?3 WHERE id = ?1",
            invoice_number.to_string(),
        )
        .await
    }

    async fn set_tracking_number(&self, order_id: &str, tracking_number: &str) -> Result<()> {
        self.update_column(
            order_id,
            "UPDATE orders SET tracking_number = ?2, updated_at = ?3 WHERE id = ?1",
            tracking_number.to_string(),
        )
        .await
    }
}

fn map_order_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let id: String = row.get(0)?;
    let status_raw: String = row.get(4)?;
    let status = match status_raw.parse::<OrderStatus>() {
        Ok(status) => status,
        Err(err) => {
            warn!(order_id = %id, raw_status = %status_raw, error = %err,
                "invalid order status in sqlite, defaulting to pending");
            OrderStatus::Pending
        }
    };

    Ok(Order {
        id,
        tenant_id: row.get(1)?,
        remote_order_id: row.get(2)?,
        client_id: row.get(3)?,
        status,
        total_cents: row.get(5)?,
        paid_cents: row.get(6)?,
        currency: row.get(7)?,
        invoice_number: row.get(8)?,
        tracking_number: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use orderbridge_domain::Client;
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;

    async fn setup() -> (SqliteOrderRepository, Arc<DbManager>, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db_path = temp_dir.path().join("test.db");

        let manager = DbManager::new(&db_path, 4).expect("manager created");
        manager.run_migrations().expect("migrations applied");
        let manager = Arc::new(manager);
        let repo = SqliteOrderRepository::new(Arc::clone(&manager));

        (repo, manager, temp_dir)
    }

    fn insert_client(manager: &DbManager) -> Client {
        let client = Client::new("tenant-1", "Ada");
        let conn = manager.get_connection().unwrap();
        conn.execute(
            "INSERT INTO clients (id, tenant_id, name, order_count, lifetime_value_cents, created_at)
             VALUES (?1, ?2, ?3, 0, 0, ?4)",
            rusqlite::params![client.id, client.tenant_id, client.name, client.created_at],
        )
        .unwrap();
        client
    }

    fn sample_order(client_id: &str, remote_order_id: &str) -> (Order, Vec<OrderLineItem>) {
        let now = Utc::now().timestamp();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            tenant_id: "tenant-1".to_string(),
            remote_order_id: remote_order_id.to_string(),
            client_id: client_id.to_string(),
            status: OrderStatus::Pending,
            total_cents: 12_500,
            paid_cents: 0,
            currency: "PLN".to_string(),
            invoice_number: None,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        };
        let lines = vec![OrderLineItem {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            remote_product_id: "prod-9".to_string(),
            name: "Widget".to_string(),
            quantity: 2,
            unit_price_cents: 6_250,
        }];
        (order, lines)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_and_find_round_trip() {
        let (repo, manager, _temp) = setup().await;
        let client = insert_client(&manager);
        let (order, lines) = sample_order(&client.id, "555");

        repo.insert(&order, &lines).await.unwrap();

        let found = repo.find_by_remote_id("tenant-1", "555").await.unwrap().unwrap();
        assert_eq!(found.id, order.id);
        assert_eq!(found.total_cents, 12_500);

        let conn = manager.get_connection().unwrap();
        let line_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM order_line_items WHERE order_id = ?1",
                rusqlite::params![order.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(line_count, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_remote_order_id_is_rejected() {
        let (repo, manager, _temp) = setup().await;
        let client = insert_client(&manager);
        let (order, lines) = sample_order(&client.id, "555");
        repo.insert(&order, &lines).await.unwrap();

        let (second, second_lines) = sample_order(&client.id, "555");
        assert!(repo.insert(&second, &second_lines).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_payment_invoice_and_tracking_updates() {
        let (repo, manager, _temp) = setup().await;
        let client = insert_client(&manager);
        let (order, lines) = sample_order(&client.id, "555");
        repo.insert(&order, &lines).await.unwrap();

        repo.update_status(&order.id, OrderStatus::Processing).await.unwrap();
        repo.record_payment(&order.id, 12_500).await.unwrap();
        repo.set_invoice_number(&order.id, "INV-1").await.unwrap();
        repo.set_tracking_number(&order.id, "1Z999").await.unwrap();

        let found = repo.find_by_remote_id("tenant-1", "555").await.unwrap().unwrap();
        assert_eq!(found.status, OrderStatus::Processing);
        assert_eq!(found.paid_cents, 12_500);
        assert_eq!(found.invoice_number.as_deref(), Some("INV-1"));
        assert_eq!(found.tracking_number.as_deref(), Some("1Z999"));
    }
}
