//! HTTP client for the messaging service and operator alert channel.
//!
//! The pipeline treats both as fire-and-forget collaborators: callers log
//! failures and move on, so this client keeps no retry or queueing logic.

use std::time::Duration;

use async_trait::async_trait;
use orderbridge_core::{MessagingGateway, OperatorNotifier};
use orderbridge_domain::{BridgeError, Client, Order, QueueItem, Result};
use serde_json::json;
use tracing::{debug, instrument};

use crate::errors::InfraError;

/// Configuration for the messaging client.
#[derive(Debug, Clone)]
pub struct MessagingClientConfig {
    /// Base URL of the messaging service.
    pub base_url: String,
    /// Timeout for each request.
    pub timeout: Duration,
}

impl Default for MessagingClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9020".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// reqwest-backed implementation of [`MessagingGateway`] and
/// [`OperatorNotifier`].
pub struct MessagingClient {
    http: reqwest::Client,
    config: MessagingClientConfig,
}

impl MessagingClient {
    pub fn new(config: MessagingClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    #[instrument(skip(self, body))]
    async fn post(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!(url, "messaging call");
        self.http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::from(InfraError::from(e)))?
            .error_for_status()
            .map_err(|e| BridgeError::from(InfraError::from(e)))?;
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for MessagingClient {
    async fn send_welcome(&self, tenant_id: &str, client: &Client) -> Result<()> {
        self.post(
            "/messages",
            json!({
                "tenant_id": tenant_id,
                "kind": "welcome",
                "client_id": client.id,
                "email": client.email,
                "phone": client.phone,
            }),
        )
        .await
    }

    async fn send_upsell(&self, tenant_id: &str, order: &Order) -> Result<()> {
        self.post(
            "/messages",
            json!({
                "tenant_id": tenant_id,
                "kind": "upsell",
                "order_id": order.id,
                "client_id": order.client_id,
            }),
        )
        .await
    }

    async fn schedule_reorder_reminder(&self, tenant_id: &str, order: &Order) -> Result<()> {
        self.post(
            "/messages",
            json!({
                "tenant_id": tenant_id,
                "kind": "reorder_reminder",
                "order_id": order.id,
                "client_id": order.client_id,
            }),
        )
        .await
    }
}

#[async_trait]
impl OperatorNotifier for MessagingClient {
    async fn notify_dead_letter(&self, item: &QueueItem, error: &str) -> Result<()> {
        self.post(
            "/alerts",
            json!({
                "tenant_id": item.tenant_id,
                "source_event_id": item.source_event_id,
                "kind": item.kind.wire_name(),
                "retry_count": item.retry_count,
                "error": error,
            }),
        )
        .await
    }
}
