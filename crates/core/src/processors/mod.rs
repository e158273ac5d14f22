//! Event processors: one per remote event kind.
//!
//! Every processor is idempotent. The queue's dedup key stops most duplicate
//! work before it starts, but processors still re-check for existing local
//! records before creating anything, so a stale-sweep redelivery or a
//! poll/webhook race can never duplicate domain state.
//!
//! Primary writes propagate errors to the router; secondary effects
//! (messaging, aggregate stats, remote stock pushes) are best-effort and
//! only ever logged.

use std::sync::Arc;

use async_trait::async_trait;
use orderbridge_domain::{BridgeError, EventKind, QueueItem, Result};
use tracing::warn;

use crate::sync::ports::{
    ClientRepository, MessagingGateway, OrderRepository, RemoteOrderApi, StockLedger,
};

mod invoice_created;
mod order_created;
mod package_created;
mod payment_received;
mod product_changed;
mod status_changed;

pub use invoice_created::InvoiceCreatedProcessor;
pub use order_created::OrderCreatedProcessor;
pub use package_created::PackageCreatedProcessor;
pub use payment_received::PaymentReceivedProcessor;
pub use product_changed::ProductChangedProcessor;
pub use status_changed::StatusChangedProcessor;

/// Result of a processor run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Side effects were applied.
    Applied,
    /// Nothing to do: duplicate, deferred, or unknown remote vocabulary.
    /// Carries the reason for the router's logs.
    Skipped(String),
}

/// A processor for one event kind.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    /// The kind this processor handles.
    fn kind(&self) -> EventKind;

    /// Apply the event's side effects. Must be safe to run more than once
    /// for the same `source_event_id`.
    async fn process(&self, item: &QueueItem) -> Result<ProcessOutcome>;
}

/// Collaborators shared by all processors.
#[derive(Clone)]
pub struct ProcessorContext {
    pub remote: Arc<dyn RemoteOrderApi>,
    pub clients: Arc<dyn ClientRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub stock: Arc<dyn StockLedger>,
    pub messaging: Arc<dyn MessagingGateway>,
}

/// The closed set of processors the router dispatches over.
pub struct ProcessorSet {
    processors: Vec<Arc<dyn EventProcessor>>,
}

impl ProcessorSet {
    /// The full production set, one processor per handled kind.
    pub fn standard(ctx: ProcessorContext) -> Self {
        Self {
            processors: vec![
                Arc::new(OrderCreatedProcessor::new(ctx.clone())),
                Arc::new(PaymentReceivedProcessor::new(ctx.clone())),
                Arc::new(StatusChangedProcessor::new(ctx.clone())),
                Arc::new(ProductChangedProcessor::new(ctx.clone())),
                Arc::new(InvoiceCreatedProcessor::new(ctx.clone())),
                Arc::new(PackageCreatedProcessor::new(ctx)),
            ],
        }
    }

    /// Build a set from explicit processors (tests, partial deployments).
    pub fn from_processors(processors: Vec<Arc<dyn EventProcessor>>) -> Self {
        Self { processors }
    }

    /// Processor for a kind, `None` for unhandled kinds.
    pub fn get(&self, kind: &EventKind) -> Option<&Arc<dyn EventProcessor>> {
        self.processors.iter().find(|p| &p.kind() == kind)
    }
}

/// The remote order id an order-scoped event points at.
pub(crate) fn require_order_id(item: &QueueItem) -> Result<String> {
    if let Some(id) = &item.related_order_id {
        return Ok(id.clone());
    }
    item.payload
        .get("order_id")
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| {
            BridgeError::Validation(format!(
                "event {} carries no order id",
                item.source_event_id
            ))
        })
}

/// The remote object id a non-order event points at.
///
/// Journal entries always carry one, so its absence there is a validation
/// error. Webhook pushes may arrive without it; `Ok(None)` tells the caller
/// to skip and let the journal-delivered copy apply the effect.
pub(crate) fn object_id(item: &QueueItem) -> Result<Option<String>> {
    match item.payload.get("object_id").and_then(|v| v.as_str()) {
        Some(id) => Ok(Some(id.to_string())),
        None if is_webhook_origin(item) => Ok(None),
        None => Err(BridgeError::Validation(format!(
            "event {} carries no object id",
            item.source_event_id
        ))),
    }
}

/// Webhook-delivered items carry an `evt:` dedup key instead of a journal
/// position; they are an accelerant, not a source of truth.
pub(crate) fn is_webhook_origin(item: &QueueItem) -> bool {
    item.source_event_id.starts_with("evt:")
}

/// Log-and-continue for secondary effects.
pub(crate) fn best_effort(result: Result<()>, context: &str) {
    if let Err(err) = result {
        warn!(error = %err, context, "best-effort step failed, continuing");
    }
}
