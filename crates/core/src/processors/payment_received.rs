//! Records a payment against an already-imported order.

use async_trait::async_trait;
use orderbridge_domain::{BridgeError, EventKind, OrderStatus, QueueItem, Result};
use tracing::{info, instrument};

use super::{require_order_id, EventProcessor, ProcessOutcome, ProcessorContext};

/// Handles `payment_received`.
///
/// The journal entry is a thin pointer, so the paid amount comes from a fresh
/// order fetch. Re-running overwrites `paid_cents` with the same remote value,
/// which keeps the operation idempotent without any local bookkeeping.
pub struct PaymentReceivedProcessor {
    ctx: ProcessorContext,
}

impl PaymentReceivedProcessor {
    pub fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventProcessor for PaymentReceivedProcessor {
    fn kind(&self) -> EventKind {
        EventKind::PaymentReceived
    }

    #[instrument(skip(self, item), fields(source_event_id = %item.source_event_id))]
    async fn process(&self, item: &QueueItem) -> Result<ProcessOutcome> {
        let order_id = require_order_id(item)?;
        let tenant_id = &item.tenant_id;

        let Some(order) = self.ctx.orders.find_by_remote_id(tenant_id, &order_id).await? else {
            return Ok(ProcessOutcome::Skipped(format!(
                "order {order_id} not imported yet, payment will apply after import"
            )));
        };

        let detail = match self.ctx.remote.fetch_order(tenant_id, &order_id).await {
            Ok(detail) => detail,
            Err(BridgeError::NotFound(_)) => {
                return Ok(ProcessOutcome::Skipped(format!(
                    "order {order_id} no longer visible on the remote side"
                )));
            }
            Err(err) => return Err(err),
        };

        self.ctx.orders.record_payment(&order.id, detail.paid_cents).await?;

        // A payment moves a pending order forward; later statuses are never
        // rolled back from here.
        if order.status == OrderStatus::Pending {
            self.ctx.orders.update_status(&order.id, OrderStatus::Processing).await?;
        }

        info!(order_id = %order.id, paid_cents = detail.paid_cents, "recorded payment");
        Ok(ProcessOutcome::Applied)
    }
}
