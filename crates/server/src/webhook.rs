//! Webhook listener for pushed remote events.
//!
//! The webhook is an accelerant, never the source of truth: the journal
//! poller delivers the same events with its own dedup key, so the handler
//! only authenticates, validates shape, and enqueues. Events whose entity is
//! not yet known locally are still accepted with 200; deferral is the
//! processor's job, and a non-2xx streak would make the remote system
//! disable the webhook.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use orderbridge_domain::{EventKind, QueueItem};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::state::AppState;

pub const TENANT_ID_HEADER: &str = "X-Tenant-Id";
pub const WEBHOOK_TOKEN_HEADER: &str = "X-Webhook-Token";

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/webhooks/events", post(receive_event))
        .with_state(state)
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy", version: env!("CARGO_PKG_VERSION") })
}

/// Remote ids arrive as numbers or strings depending on the event source.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdField {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for IdField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdField::Number(n) => write!(f, "{n}"),
            IdField::Text(s) => f.write_str(s),
        }
    }
}

/// Minimum shape a push must carry; everything else rides along in the
/// stored payload.
#[derive(Debug, Deserialize)]
struct WebhookPayload {
    event: String,
    order_id: IdField,
    #[serde(default)]
    log_id: Option<i64>,
}

fn reject(status: StatusCode, message: &'static str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn accepted(status: &'static str) -> Response {
    (StatusCode::OK, Json(json!({ "status": status }))).into_response()
}

async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(tenant_id) = header_str(&headers, TENANT_ID_HEADER) else {
        return reject(StatusCode::UNAUTHORIZED, "missing X-Tenant-Id header");
    };
    let Some(tenant) = state.tenant(tenant_id) else {
        warn!(tenant_id, "webhook for unknown tenant");
        return reject(StatusCode::UNAUTHORIZED, "unknown tenant");
    };
    if header_str(&headers, WEBHOOK_TOKEN_HEADER) != Some(tenant.webhook_secret.as_str()) {
        warn!(tenant_id, "webhook token mismatch");
        return reject(StatusCode::UNAUTHORIZED, "invalid webhook token");
    }

    let raw: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            debug!(tenant_id, error = %err, "unparseable webhook body");
            return reject(StatusCode::BAD_REQUEST, "invalid JSON body");
        }
    };
    let payload: WebhookPayload = match serde_json::from_value(raw.clone()) {
        Ok(payload) => payload,
        Err(err) => {
            debug!(tenant_id, error = %err, "webhook body missing required fields");
            return reject(StatusCode::BAD_REQUEST, "body must carry event and order_id");
        }
    };
    let event = payload.event.trim();
    if event.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "event must not be empty");
    }

    let order_id = payload.order_id.to_string();
    // Pushes that carry the journal id share the poller's dedup key; the
    // rest get a push-scoped key so the later journal entry still lands.
    let source_event_id = match payload.log_id {
        Some(log_id) => format!("journal:{log_id}"),
        None => format!("evt:{order_id}:{event}"),
    };

    let item = QueueItem::new(
        tenant_id,
        &source_event_id,
        EventKind::from(event.to_string()),
        Some(order_id),
        raw,
    );
    match state.queue.enqueue(&item).await {
        Ok(true) => {
            info!(tenant_id, source_event_id, event, "webhook event accepted");
            accepted("accepted")
        }
        Ok(false) => {
            debug!(tenant_id, source_event_id, "duplicate webhook delivery ignored");
            accepted("duplicate")
        }
        Err(err) => {
            error!(tenant_id, error = %err, "failed to enqueue webhook event");
            reject(StatusCode::INTERNAL_SERVER_ERROR, "storage failure")
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
