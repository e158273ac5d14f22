//! Port interfaces for the synchronization pipeline

use async_trait::async_trait;
use orderbridge_domain::{
    Client, EventKind, JournalEntry, Order, OrderLineItem, OrderStatus, QueueItem, RemoteOrder,
    RemoteProduct, Result, StockLedgerEntry, SyncState,
};

/// Durable, deduplicated backlog of pending sync work.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Insert with upsert-ignore-duplicate semantics on
    /// `(tenant_id, source_event_id)`. Returns `true` when a row was
    /// actually inserted, `false` when the event was already known.
    async fn enqueue(&self, item: &QueueItem) -> Result<bool>;

    /// Pending items, oldest first across all tenants.
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<QueueItem>>;

    /// Compare-and-set pending → processing. Returns `false` when another
    /// worker already picked the item up (or it is no longer pending).
    async fn mark_processing(&self, id: &str) -> Result<bool>;

    /// processing → completed, stamping `processed_at`.
    async fn mark_completed(&self, id: &str) -> Result<()>;

    /// processing → pending with `retry_count` bumped and `last_error` set.
    async fn mark_retry(&self, id: &str, error: &str) -> Result<()>;

    /// processing → failed (dead letter).
    async fn mark_failed(&self, id: &str, error: &str) -> Result<()>;

    /// Sweep `processing` rows older than the given age back to `pending`.
    /// Returns the number of rows requeued.
    async fn requeue_stale(&self, older_than_secs: i64) -> Result<usize>;

    /// Look an item up by its dedup key.
    async fn get(&self, tenant_id: &str, source_event_id: &str) -> Result<Option<QueueItem>>;
}

/// Per-tenant cursor and poll-cycle mutual exclusion.
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    /// Current state, creating a zero-cursor row for unknown tenants.
    async fn get_or_create(&self, tenant_id: &str) -> Result<SyncState>;

    /// Compare-and-set `in_progress` false → true. Returns the acquired
    /// state, or `None` when another poll cycle already holds the flag.
    async fn begin_poll(&self, tenant_id: &str) -> Result<Option<SyncState>>;

    /// Release the flag on every path: clears `in_progress`, stamps
    /// `last_synced_at`, advances the cursor monotonically when `cursor` is
    /// given, and appends `error` to the bounded error list when present.
    async fn finish_poll(
        &self,
        tenant_id: &str,
        cursor: Option<i64>,
        error: Option<&str>,
    ) -> Result<()>;
}

/// CRM client records.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn find_by_tax_id(&self, tenant_id: &str, tax_id: &str) -> Result<Option<Client>>;

    async fn find_by_phone(&self, tenant_id: &str, phone: &str) -> Result<Option<Client>>;

    async fn insert(&self, client: &Client) -> Result<()>;

    /// Bump aggregate stats after an imported order. Best-effort from the
    /// caller's point of view.
    async fn add_order_stats(&self, client_id: &str, total_cents: i64) -> Result<()>;
}

/// CRM orders and their line items.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_remote_id(
        &self,
        tenant_id: &str,
        remote_order_id: &str,
    ) -> Result<Option<Order>>;

    /// Insert an order together with its line items.
    async fn insert(&self, order: &Order, lines: &[OrderLineItem]) -> Result<()>;

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<()>;

    async fn record_payment(&self, order_id: &str, paid_cents: i64) -> Result<()>;

    async fn set_invoice_number(&self, order_id: &str, invoice_number: &str) -> Result<()>;

    async fn set_tracking_number(&self, order_id: &str, tracking_number: &str) -> Result<()>;
}

/// Append-only stock movement log.
#[async_trait]
pub trait StockLedger: Send + Sync {
    async fn record(&self, entry: &StockLedgerEntry) -> Result<()>;

    /// Net level for a product as the ledger knows it (sum of deltas).
    async fn recorded_level(&self, tenant_id: &str, remote_product_id: &str) -> Result<i64>;
}

/// The remote order-management system, reached exclusively through the
/// rate-limited API client.
#[async_trait]
pub trait RemoteOrderApi: Send + Sync {
    /// Journal entries strictly after `cursor`, limited to the given kinds.
    async fn fetch_journal(
        &self,
        tenant_id: &str,
        cursor: i64,
        kinds: &[EventKind],
        limit: usize,
    ) -> Result<Vec<JournalEntry>>;

    async fn fetch_order(&self, tenant_id: &str, remote_order_id: &str) -> Result<RemoteOrder>;

    async fn fetch_product(&self, tenant_id: &str, product_id: &str) -> Result<RemoteProduct>;

    /// Push a stock delta back to the remote system.
    async fn update_stock(&self, tenant_id: &str, product_id: &str, delta: i64) -> Result<()>;
}

/// Customer-facing messaging collaborator. All calls are fire-and-forget
/// from the pipeline's perspective; failures are logged by the caller.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_welcome(&self, tenant_id: &str, client: &Client) -> Result<()>;

    async fn send_upsell(&self, tenant_id: &str, order: &Order) -> Result<()>;

    async fn schedule_reorder_reminder(&self, tenant_id: &str, order: &Order) -> Result<()>;
}

/// Operator-visible alerting for dead-lettered items.
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    async fn notify_dead_letter(&self, item: &QueueItem, error: &str) -> Result<()>;
}
