//! sqlite-backed implementation of the client repository port.

use std::sync::Arc;

use async_trait::async_trait;
use orderbridge_core::ClientRepository;
use orderbridge_domain::{Client, Result};
use rusqlite::{OptionalExtension, Row};
use tokio::task;

use super::manager::{map_sql_error, DbManager};
use crate::errors::map_join_error;

pub struct SqliteClientRepository {
    db: Arc<DbManager>,
}

impl SqliteClientRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn find_by_column(
        &self,
        tenant_id: &str,
        column: &'static str,
        value: &str,
    ) -> Result<Option<Client>> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();
        let value = value.to_string();

        task::spawn_blocking(move || -> Result<Option<Client>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT id, tenant_id, name, email, phone, tax_id, order_count,
                        lifetime_value_cents, created_at
                 FROM clients WHERE tenant_id = ?1 AND {column} = ?2
                 ORDER BY created_at ASC LIMIT 1"
            );
            conn.query_row(&sql, rusqlite::params![tenant_id, value], map_client_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl ClientRepository for SqliteClientRepository {
    async fn find_by_tax_id(&self, tenant_id: &str, tax_id: &str) -> Result<Option<Client>> {
        self.find_by_column(tenant_id, "tax_id", tax_id).await
    }

    async fn find_by_phone(&self, tenant_id: &str, phone: &str) -> Result<Option<Client>> {
        self.find_by_column(tenant_id, "phone", phone).await
    }

    async fn insert(&self, client: &Client) -> Result<()> {
        let db = Arc::clone(&self.db);
        let client = client.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO clients (
                    id, tenant_id, name, email, phone, tax_id, order_count,
                    lifetime_value_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    client.id,
                    client.tenant_id,
                    client.name,
                    client.email,
                    client.phone,
                    client.tax_id,
                    client.order_count,
                    client.lifetime_value_cents,
                    client.created_at,
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn add_order_stats(&self, client_id: &str, total_cents: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        let client_id = client_id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE clients
                 SET order_count = order_count + 1,
                     lifetime_value_cents = lifetime_value_cents + ?2
                 WHERE id = ?1",
                rusqlite::params![client_id, total_cents],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_client_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        tax_id: row.get(5)?,
        order_count: row.get(6)?,
        lifetime_value_cents: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn setup() -> (SqliteClientRepository, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db_path = temp_dir.path().join("test.db");

        let manager = DbManager::new(&db_path, 4).expect("manager created");
        manager.run_migrations().expect("migrations applied");
        let repo = SqliteClientRepository::new(Arc::new(manager));

        (repo, temp_dir)
    }

    fn sample_client(name: &str) -> Client {
        let mut client = Client::new("tenant-1", name);
        client.email = Some(format!("{}@example.com", name.to_lowercase()));
        client.phone = Some("+48 600 700 800".to_string());
        client.tax_id = Some("5213017228".to_string());
        client
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_then_find_by_tax_id() {
        let (repo, _temp) = setup().await;
        let client = sample_client("Ada");

        repo.insert(&client).await.unwrap();

        let found = repo.find_by_tax_id("tenant-1", "5213017228").await.unwrap().unwrap();
        assert_eq!(found.id, client.id);
        assert_eq!(found.name, "Ada");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lookups_are_tenant_scoped() {
        let (repo, _temp) = setup().await;
        repo.insert(&sample_client("Ada")).await.unwrap();

        assert!(repo.find_by_tax_id("tenant-2", "5213017228").await.unwrap().is_none());
        assert!(repo.find_by_phone("tenant-2", "+48 600 700 800").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn add_order_stats_accumulates() {
        let (repo, _temp) = setup().await;
        let client = sample_client("Ada");
        repo.insert(&client).await.unwrap();

        repo.add_order_stats(&client.id, 10_000).await.unwrap();
        repo.add_order_stats(&client.id, 2_500).await.unwrap();

        let found = repo.find_by_tax_id("tenant-1", "5213017228").await.unwrap().unwrap();
        assert_eq!(found.order_count, 2);
        assert_eq!(found.lifetime_value_cents, 12_500);
    }
}
