//! In-memory port implementations for the pipeline integration tests.
//!
//! The queue and state store mirror the sqlite semantics (dedup key, CAS
//! transitions, monotone cursor) closely enough to exercise the poller and
//! router together without a database.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use orderbridge_core::processors::ProcessorContext;
use orderbridge_core::{
    ClientRepository, EventQueue, MessagingGateway, OperatorNotifier, OrderRepository,
    RemoteOrderApi, StockLedger, SyncStateStore,
};
use orderbridge_domain::{
    BridgeError, Client, EventKind, JournalEntry, Order, OrderLineItem, OrderStatus, QueueItem,
    QueueItemStatus, RemoteOrder, RemoteProduct, Result, StockLedgerEntry, SyncState,
};

#[derive(Default)]
pub struct MemoryQueue {
    rows: Mutex<Vec<QueueItem>>,
    /// Pick-up timestamps by item id, mirroring the sqlite `picked_at` column.
    picked: Mutex<HashMap<String, i64>>,
}

impl MemoryQueue {
    pub fn rows(&self) -> Vec<QueueItem> {
        self.rows.lock().unwrap().clone()
    }

    pub fn row(&self, source_event_id: &str) -> Option<QueueItem> {
        self.rows().into_iter().find(|r| r.source_event_id == source_event_id)
    }

    /// Pretend the row was picked up `secs` earlier than it really was.
    pub fn backdate_pick(&self, id: &str, secs: i64) {
        if let Some(picked_at) = self.picked.lock().unwrap().get_mut(id) {
            *picked_at -= secs;
        }
    }
}

#[async_trait]
impl EventQueue for MemoryQueue {
    async fn enqueue(&self, item: &QueueItem) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.tenant_id == item.tenant_id && r.source_event_id == item.source_event_id)
        {
            return Ok(false);
        }
        rows.push(item.clone());
        Ok(true)
    }

    async fn fetch_pending(&self, limit: usize) -> Result<Vec<QueueItem>> {
        let rows = self.rows.lock().unwrap();
        let mut pending: Vec<QueueItem> =
            rows.iter().filter(|r| r.status == QueueItemStatus::Pending).cloned().collect();
        pending.sort_by_key(|r| r.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_processing(&self, id: &str) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|r| r.id == id && r.status == QueueItemStatus::Pending) {
            Some(row) => {
                row.status = QueueItemStatus::Processing;
                self.picked.lock().unwrap().insert(id.to_string(), Utc::now().timestamp());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_completed(&self, id: &str) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.status = QueueItemStatus::Completed;
            row.processed_at = Some(Utc::now().timestamp());
        }
        Ok(())
    }

    async fn mark_retry(&self, id: &str, error: &str) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.status = QueueItemStatus::Pending;
            row.retry_count += 1;
            row.last_error = Some(error.to_string());
        }
        Ok(())
    }

    async fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.status = QueueItemStatus::Failed;
            row.last_error = Some(error.to_string());
            row.processed_at = Some(Utc::now().timestamp());
        }
        Ok(())
    }

    async fn requeue_stale(&self, older_than_secs: i64) -> Result<usize> {
        let cutoff = Utc::now().timestamp() - older_than_secs;
        let mut rows = self.rows.lock().unwrap();
        let mut picked = self.picked.lock().unwrap();
        let mut requeued = 0;
        for row in rows.iter_mut() {
            let stale = picked.get(&row.id).copied().is_some_and(|t| t < cutoff);
            if row.status == QueueItemStatus::Processing && stale {
                row.status = QueueItemStatus::Pending;
                picked.remove(&row.id);
                requeued += 1;
            }
        }
        Ok(requeued)
    }

    async fn get(&self, tenant_id: &str, source_event_id: &str) -> Result<Option<QueueItem>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.tenant_id == tenant_id && r.source_event_id == source_event_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<String, SyncState>>,
}

impl MemoryStateStore {
    pub fn snapshot(&self, tenant_id: &str) -> Option<SyncState> {
        self.states.lock().unwrap().get(tenant_id).cloned()
    }
}

#[async_trait]
impl SyncStateStore for MemoryStateStore {
    async fn get_or_create(&self, tenant_id: &str) -> Result<SyncState> {
        let mut states = self.states.lock().unwrap();
        Ok(states.entry(tenant_id.to_string()).or_insert_with(|| SyncState::new(tenant_id)).clone())
    }

    async fn begin_poll(&self, tenant_id: &str) -> Result<Option<SyncState>> {
        let mut states = self.states.lock().unwrap();
        let state =
            states.entry(tenant_id.to_string()).or_insert_with(|| SyncState::new(tenant_id));
        if state.in_progress {
            return Ok(None);
        }
        state.in_progress = true;
        Ok(Some(state.clone()))
    }

    async fn finish_poll(
        &self,
        tenant_id: &str,
        cursor: Option<i64>,
        error: Option<&str>,
    ) -> Result<()> {
        let mut states = self.states.lock().unwrap();
        let state =
            states.entry(tenant_id.to_string()).or_insert_with(|| SyncState::new(tenant_id));
        state.in_progress = false;
        state.last_synced_at = Some(Utc::now().timestamp());
        if let Some(cursor) = cursor {
            state.cursor = state.cursor.max(cursor);
        }
        if let Some(error) = error {
            state.last_errors.insert(0, error.to_string());
            state.last_errors.truncate(orderbridge_domain::constants::MAX_RECORDED_ERRORS);
        }
        Ok(())
    }
}

/// Scriptable remote system: a journal, order and product catalogs, and
/// switches for injected failures.
#[derive(Default)]
pub struct ScriptedRemote {
    pub journal: Mutex<Vec<JournalEntry>>,
    pub orders: Mutex<Vec<RemoteOrder>>,
    pub products: Mutex<Vec<RemoteProduct>>,
    pub journal_calls: AtomicUsize,
    pub fail_journal: AtomicBool,
    pub fail_order_fetch: AtomicBool,
}

impl ScriptedRemote {
    pub fn push_journal(&self, entry: JournalEntry) {
        self.journal.lock().unwrap().push(entry);
    }

    pub fn push_order(&self, order: RemoteOrder) {
        self.orders.lock().unwrap().push(order);
    }
}

#[async_trait]
impl RemoteOrderApi for ScriptedRemote {
    async fn fetch_journal(
        &self,
        _tenant_id: &str,
        cursor: i64,
        _kinds: &[EventKind],
        limit: usize,
    ) -> Result<Vec<JournalEntry>> {
        self.journal_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_journal.load(Ordering::SeqCst) {
            return Err(BridgeError::Transport("journal endpoint unreachable".into()));
        }
        let mut entries: Vec<JournalEntry> = self
            .journal
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.log_id > cursor)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.log_id);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn fetch_order(&self, _tenant_id: &str, remote_order_id: &str) -> Result<RemoteOrder> {
        if self.fail_order_fetch.load(Ordering::SeqCst) {
            return Err(BridgeError::Transport("order endpoint unreachable".into()));
        }
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.order_id == remote_order_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(format!("order {remote_order_id}")))
    }

    async fn fetch_product(&self, _tenant_id: &str, product_id: &str) -> Result<RemoteProduct> {
        self.products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.product_id == product_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(format!("product {product_id}")))
    }

    async fn update_stock(&self, _tenant_id: &str, _product_id: &str, _delta: i64) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryClients {
    pub rows: Mutex<Vec<Client>>,
}

#[async_trait]
impl ClientRepository for MemoryClients {
    async fn find_by_tax_id(&self, tenant_id: &str, tax_id: &str) -> Result<Option<Client>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.tenant_id == tenant_id && c.tax_id.as_deref() == Some(tax_id))
            .cloned())
    }

    async fn find_by_phone(&self, tenant_id: &str, phone: &str) -> Result<Option<Client>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.tenant_id == tenant_id && c.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn insert(&self, client: &Client) -> Result<()> {
        self.rows.lock().unwrap().push(client.clone());
        Ok(())
    }

    async fn add_order_stats(&self, client_id: &str, total_cents: i64) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(client) = rows.iter_mut().find(|c| c.id == client_id) {
            client.order_count += 1;
            client.lifetime_value_cents += total_cents;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryOrders {
    pub rows: Mutex<Vec<Order>>,
    pub lines: Mutex<Vec<OrderLineItem>>,
}

#[async_trait]
impl OrderRepository for MemoryOrders {
    async fn find_by_remote_id(
        &self,
        tenant_id: &str,
        remote_order_id: &str,
    ) -> Result<Option<Order>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.tenant_id == tenant_id && o.remote_order_id == remote_order_id)
            .cloned())
    }

    async fn insert(&self, order: &Order, lines: &[OrderLineItem]) -> Result<()> {
        self.rows.lock().unwrap().push(order.clone());
        self.lines.lock().unwrap().extend(lines.iter().cloned());
        Ok(())
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(order) = rows.iter_mut().find(|o| o.id == order_id) {
            order.status = status;
        }
        Ok(())
    }

    async fn record_payment(&self, order_id: &str, paid_cents: i64) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(order) = rows.iter_mut().find(|o| o.id == order_id) {
            order.paid_cents = paid_cents;
        }
        Ok(())
    }

    async fn set_invoice_number(&self, order_id: &str, invoice_number: &str) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(order) = rows.iter_mut().find(|o| o.id == order_id) {
            order.invoice_number = Some(invoice_number.to_string());
        }
        Ok(())
    }

    async fn set_tracking_number(&self, order_id: &str, tracking_number: &str) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(order) = rows.iter_mut().find(|o| o.id == order_id) {
            order.tracking_number = Some(tracking_number.to_string());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStock {
    pub entries: Mutex<Vec<StockLedgerEntry>>,
}

#[async_trait]
impl StockLedger for MemoryStock {
    async fn record(&self, entry: &StockLedgerEntry) -> Result<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn recorded_level(&self, tenant_id: &str, remote_product_id: &str) -> Result<i64> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.remote_product_id == remote_product_id)
            .map(|e| e.delta)
            .sum())
    }
}

#[derive(Default)]
pub struct SilentMessaging;

#[async_trait]
impl MessagingGateway for SilentMessaging {
    async fn send_welcome(&self, _tenant_id: &str, _client: &Client) -> Result<()> {
        Ok(())
    }

    async fn send_upsell(&self, _tenant_id: &str, _order: &Order) -> Result<()> {
        Ok(())
    }

    async fn schedule_reorder_reminder(&self, _tenant_id: &str, _order: &Order) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingNotifier {
    pub alerts: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl OperatorNotifier for CountingNotifier {
    async fn notify_dead_letter(&self, item: &QueueItem, error: &str) -> Result<()> {
        self.alerts.lock().unwrap().push((item.source_event_id.clone(), error.to_string()));
        Ok(())
    }
}

/// Everything a pipeline test needs, wired over shared fakes.
pub struct Pipeline {
    pub remote: Arc<ScriptedRemote>,
    pub queue: Arc<MemoryQueue>,
    pub state_store: Arc<MemoryStateStore>,
    pub clients: Arc<MemoryClients>,
    pub orders: Arc<MemoryOrders>,
    pub stock: Arc<MemoryStock>,
    pub notifier: Arc<CountingNotifier>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            remote: Arc::new(ScriptedRemote::default()),
            queue: Arc::new(MemoryQueue::default()),
            state_store: Arc::new(MemoryStateStore::default()),
            clients: Arc::new(MemoryClients::default()),
            orders: Arc::new(MemoryOrders::default()),
            stock: Arc::new(MemoryStock::default()),
            notifier: Arc::new(CountingNotifier::default()),
        }
    }

    pub fn processor_context(&self) -> ProcessorContext {
        ProcessorContext {
            remote: self.remote.clone(),
            clients: self.clients.clone(),
            orders: self.orders.clone(),
            stock: self.stock.clone(),
            messaging: Arc::new(SilentMessaging),
        }
    }
}
