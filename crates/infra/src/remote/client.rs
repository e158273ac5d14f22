//! Rate-limited client for the remote order-management RPC API.
//!
//! The remote API is a single POST endpoint taking `{method, parameters}`
//! with a per-tenant token header. This client is the only chokepoint to it:
//! the sliding-window limiter is awaited before every call, and every failure
//! mode is normalized into [`BridgeError`]. It never retries internally; the
//! retry policy lives in the event router.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orderbridge_common::{SlidingWindowConfig, SlidingWindowLimiter};
use orderbridge_core::RemoteOrderApi;
use orderbridge_domain::constants::{RATE_LIMIT_MAX_CALLS, RATE_LIMIT_WINDOW_SECS};
use orderbridge_domain::{
    BridgeError, EventKind, JournalEntry, RemoteOrder, RemoteProduct, Result,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::errors::InfraError;

const TOKEN_HEADER: &str = "X-Auth-Token";

/// Configuration for the remote API client.
#[derive(Debug, Clone)]
pub struct RemoteApiConfig {
    /// RPC endpoint URL.
    pub base_url: String,
    /// Timeout for each request.
    pub timeout: Duration,
    /// Rate limit shared by all tenants of this deployment.
    pub rate_limit: SlidingWindowConfig,
}

impl Default for RemoteApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.example-oms.com/connector".to_string(),
            timeout: Duration::from_secs(30),
            rate_limit: SlidingWindowConfig {
                max_calls: RATE_LIMIT_MAX_CALLS,
                window: Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
            },
        }
    }
}

/// Envelope every remote response is wrapped in.
#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    status: String,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(flatten)]
    rest: Value,
}

/// The single gateway to the remote system.
pub struct RemoteApiClient {
    http: reqwest::Client,
    limiter: Arc<SlidingWindowLimiter>,
    config: RemoteApiConfig,
    /// Per-tenant API tokens.
    tokens: HashMap<String, String>,
}

impl RemoteApiClient {
    pub fn new(config: RemoteApiConfig, tokens: HashMap<String, String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to build HTTP client: {e}")))?;

        let limiter = SlidingWindowLimiter::with_config(config.rate_limit.clone())
            .map_err(BridgeError::Config)?;

        Ok(Self { http, limiter: Arc::new(limiter), config, tokens })
    }

    fn token_for(&self, tenant_id: &str) -> Result<&str> {
        self.tokens
            .get(tenant_id)
            .map(String::as_str)
            .ok_or_else(|| BridgeError::Config(format!("no remote token for tenant {tenant_id}")))
    }

    /// Low-level RPC call. Awaits the rate limiter, POSTs
    /// `{method, parameters}`, and normalizes the response.
    #[instrument(skip(self, parameters))]
    pub async fn call(&self, tenant_id: &str, method: &str, parameters: Value) -> Result<Value> {
        let token = self.token_for(tenant_id)?;

        self.limiter.acquire().await;
        debug!(tenant_id, method, "remote call");

        let response = self
            .http
            .post(&self.config.base_url)
            .header(TOKEN_HEADER, token)
            .json(&json!({ "method": method, "parameters": parameters }))
            .send()
            .await
            .map_err(|e| BridgeError::from(InfraError::from(e)))?;

        let status = response.status();
        if !status.is_success() {
            // The remote returns declared errors with HTTP 200; anything else
            // is a transport-level failure.
            let body = response.text().await.unwrap_or_default();
            warn!(tenant_id, method, %status, "remote call failed at HTTP level");
            return Err(normalize_http_failure(status, &body));
        }

        let envelope: ResponseEnvelope = response
            .json()
            .await
            .map_err(|e| BridgeError::Transport(format!("malformed remote response: {e}")))?;

        if envelope.status.eq_ignore_ascii_case("error") {
            let code = envelope.error_code.unwrap_or_else(|| "ERROR_UNKNOWN".to_string());
            let message = envelope.error_message.unwrap_or_default();
            warn!(tenant_id, method, code, "remote declared an error");
            if code.eq_ignore_ascii_case("ERROR_NOT_FOUND") {
                return Err(BridgeError::NotFound(message));
            }
            return Err(BridgeError::Remote { code, message });
        }

        Ok(envelope.rest)
    }

    fn extract<T: serde::de::DeserializeOwned>(body: Value, field: &str) -> Result<T> {
        let value = body
            .get(field)
            .cloned()
            .ok_or_else(|| {
                BridgeError::Transport(format!("remote response is missing the {field} field"))
            })?;
        serde_json::from_value(value)
            .map_err(|e| BridgeError::Transport(format!("malformed {field} in remote response: {e}")))
    }
}

#[async_trait]
impl RemoteOrderApi for RemoteApiClient {
    async fn fetch_journal(
        &self,
        tenant_id: &str,
        cursor: i64,
        kinds: &[EventKind],
        limit: usize,
    ) -> Result<Vec<JournalEntry>> {
        let kind_names: Vec<&str> = kinds.iter().map(EventKind::wire_name).collect();
        let body = self
            .call(
                tenant_id,
                "get_journal_list",
                json!({ "last_log_id": cursor, "log_types": kind_names, "limit": limit }),
            )
            .await?;
        Self::extract(body, "logs")
    }

    async fn fetch_order(&self, tenant_id: &str, remote_order_id: &str) -> Result<RemoteOrder> {
        let body =
            self.call(tenant_id, "get_order", json!({ "order_id": remote_order_id })).await?;
        Self::extract(body, "order")
    }

    async fn fetch_product(&self, tenant_id: &str, product_id: &str) -> Result<RemoteProduct> {
        let body =
            self.call(tenant_id, "get_product", json!({ "product_id": product_id })).await?;
        Self::extract(body, "product")
    }

    async fn update_stock(&self, tenant_id: &str, product_id: &str, delta: i64) -> Result<()> {
        self.call(
            tenant_id,
            "update_product_stock",
            json!({ "product_id": product_id, "delta": delta }),
        )
        .await?;
        Ok(())
    }
}

fn normalize_http_failure(status: reqwest::StatusCode, body: &str) -> BridgeError {
    match status.as_u16() {
        401 | 403 => BridgeError::Remote {
            code: "ERROR_AUTH".to_string(),
            message: format!("HTTP {status}"),
        },
        _ => {
            let detail = if body.is_empty() { String::new() } else { format!(": {body}") };
            BridgeError::Transport(format!("HTTP {status}{detail}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> RemoteApiClient {
        let config = RemoteApiConfig {
            base_url: format!("{}/connector", server.uri()),
            ..RemoteApiConfig::default()
        };
        let mut tokens = HashMap::new();
        tokens.insert("tenant-1".to_string(), "secret-token".to_string());
        RemoteApiClient::new(config, tokens).expect("client built")
    }

    #[tokio::test]
    async fn fetch_journal_sends_token_and_parses_entries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connector"))
            .and(header(TOKEN_HEADER, "secret-token"))
            .and(body_partial_json(json!({ "method": "get_journal_list" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "SUCCESS",
                "logs": [
                    { "log_id": 101, "kind": "order_created", "order_id": "555" },
                    { "log_id": 102, "kind": "payment_received", "order_id": "555" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let entries = client
            .fetch_journal("tenant-1", 100, EventKind::processable(), 100)
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].log_id, 101);
        assert_eq!(entries[0].source_event_id(), "journal:101");
    }

    #[tokio::test]
    async fn declared_error_body_becomes_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ERROR",
                "error_code": "ERROR_STORAGE",
                "error_message": "temporarily unavailable"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.fetch_order("tenant-1", "555").await.unwrap_err();

        match err {
            BridgeError::Remote { code, message } => {
                assert_eq!(code, "ERROR_STORAGE");
                assert_eq!(message, "temporarily unavailable");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn declared_not_found_becomes_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ERROR",
                "error_code": "ERROR_NOT_FOUND",
                "error_message": "order 555 does not exist"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.fetch_order("tenant-1", "555").await.unwrap_err();
        assert!(matches!(err, BridgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn http_500_becomes_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.fetch_product("tenant-1", "prod-9").await.unwrap_err();
        assert!(matches!(err, BridgeError::Transport(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn http_401_is_an_auth_class_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.update_stock("tenant-1", "prod-9", -1).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn unknown_tenant_is_a_config_error_without_any_call() {
        let server = MockServer::start().await;
        // No mock mounted: any request would 404 and fail differently.
        let client = client_for(&server);

        let err = client.fetch_order("tenant-9", "555").await.unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[tokio::test]
    async fn malformed_body_becomes_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.fetch_order("tenant-1", "555").await.unwrap_err();
        assert!(matches!(err, BridgeError::Transport(_)));
    }
}
