//! Queue and sync-state types shared by the poller, receiver and router.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Remote event kinds the pipeline understands.
///
/// The remote journal vocabulary is open-ended; kinds without a processor are
/// kept as [`EventKind::Unhandled`] so the router can record the skip instead
/// of silently dropping the item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    OrderCreated,
    PaymentReceived,
    StatusChanged,
    ProductChanged,
    InvoiceCreated,
    PackageCreated,
    Unhandled(String),
}

impl EventKind {
    /// Kinds the poller asks the journal for. Everything else is noise the
    /// queue should never see.
    pub fn processable() -> &'static [EventKind] {
        &[
            EventKind::OrderCreated,
            EventKind::PaymentReceived,
            EventKind::StatusChanged,
            EventKind::ProductChanged,
            EventKind::InvoiceCreated,
            EventKind::PackageCreated,
        ]
    }

    /// Wire name used by the remote journal and webhook payloads.
    pub fn wire_name(&self) -> &str {
        match self {
            Self::OrderCreated => "order_created",
            Self::PaymentReceived => "payment_received",
            Self::StatusChanged => "status_changed",
            Self::ProductChanged => "product_changed",
            Self::InvoiceCreated => "invoice_created",
            Self::PackageCreated => "package_created",
            Self::Unhandled(raw) => raw,
        }
    }

    pub fn is_handled(&self) -> bool {
        !matches!(self, Self::Unhandled(_))
    }
}

impl From<String> for EventKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "order_created" => Self::OrderCreated,
            "payment_received" => Self::PaymentReceived,
            "status_changed" => Self::StatusChanged,
            "product_changed" => Self::ProductChanged,
            "invoice_created" => Self::InvoiceCreated,
            "package_created" => Self::PackageCreated,
            _ => Self::Unhandled(raw),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.wire_name().to_string()
    }
}

impl FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Lifecycle of a queue item. Transitions are owned by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for QueueItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for QueueItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown queue item status: {other}")),
        }
    }
}

/// One unit of pending sync work.
///
/// `source_event_id` is the remote system's unique key and the sole dedup
/// key: the poller and the webhook receiver may both observe the same event,
/// and enqueue is an upsert-ignore-duplicate on `(tenant_id,
/// source_event_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub tenant_id: String,
    pub source_event_id: String,
    pub kind: EventKind,
    pub related_order_id: Option<String>,
    /// Opaque remote-system record; processors interpret it per kind.
    pub payload: serde_json::Value,
    pub status: QueueItemStatus,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub processed_at: Option<i64>,
}

impl QueueItem {
    /// Build a fresh pending item.
    pub fn new(
        tenant_id: impl Into<String>,
        source_event_id: impl Into<String>,
        kind: EventKind,
        related_order_id: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            source_event_id: source_event_id.into(),
            kind,
            related_order_id,
            payload,
            status: QueueItemStatus::Pending,
            retry_count: 0,
            last_error: None,
            created_at: Utc::now().timestamp(),
            processed_at: None,
        }
    }
}

/// Per-tenant journal position and poll-cycle bookkeeping.
///
/// `in_progress` acts as a non-reentrant lock over one poll cycle; the cursor
/// never decreases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub tenant_id: String,
    pub cursor: i64,
    pub in_progress: bool,
    pub last_synced_at: Option<i64>,
    /// Most recent poll errors, newest first, bounded.
    pub last_errors: Vec<String>,
}

impl SyncState {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            cursor: 0,
            in_progress: false,
            last_synced_at: None,
            last_errors: Vec::new(),
        }
    }
}

/// Per-invocation router result, serialized as the trigger response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSummary {
    pub processed: u32,
    pub skipped: u32,
    pub failed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_round_trips_wire_names() {
        for kind in EventKind::processable() {
            let parsed = EventKind::from(kind.wire_name().to_string());
            assert_eq!(&parsed, kind);
        }
    }

    #[test]
    fn unknown_kind_is_preserved_not_dropped() {
        let kind = EventKind::from("order_deleted".to_string());
        assert_eq!(kind, EventKind::Unhandled("order_deleted".into()));
        assert_eq!(kind.wire_name(), "order_deleted");
        assert!(!kind.is_handled());
    }

    #[test]
    fn status_parse_rejects_garbage() {
        assert!("pending".parse::<QueueItemStatus>().is_ok());
        assert!("sent".parse::<QueueItemStatus>().is_err());
    }

    #[test]
    fn new_queue_item_starts_pending() {
        let item = QueueItem::new(
            "tenant-1",
            "journal:101",
            EventKind::OrderCreated,
            Some("555".into()),
            serde_json::json!({"order_id": "555"}),
        );
        assert_eq!(item.status, QueueItemStatus::Pending);
        assert_eq!(item.retry_count, 0);
        assert!(item.processed_at.is_none());
    }
}
