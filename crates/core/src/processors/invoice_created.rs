//! Attaches a remote invoice reference to the local order.

use async_trait::async_trait;
use orderbridge_domain::{EventKind, QueueItem, Result};
use tracing::{info, instrument};

use super::{object_id, require_order_id, EventProcessor, ProcessOutcome, ProcessorContext};

/// Handles `invoice_created`.
///
/// The journal entry's `object_id` is the remote invoice reference. Setting
/// the same reference twice is a no-op by construction.
pub struct InvoiceCreatedProcessor {
    ctx: ProcessorContext,
}

impl InvoiceCreatedProcessor {
    pub fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventProcessor for InvoiceCreatedProcessor {
    fn kind(&self) -> EventKind {
        EventKind::InvoiceCreated
    }

    #[instrument(skip(self, item), fields(source_event_id = %item.source_event_id))]
    async fn process(&self, item: &QueueItem) -> Result<ProcessOutcome> {
        let order_id = require_order_id(item)?;
        let Some(invoice_number) = object_id(item)? else {
            return Ok(ProcessOutcome::Skipped(format!(
                "push for order {order_id} carries no invoice reference, \
                 the journal copy will attach it"
            )));
        };
        let tenant_id = &item.tenant_id;

        let Some(order) = self.ctx.orders.find_by_remote_id(tenant_id, &order_id).await? else {
            return Ok(ProcessOutcome::Skipped(format!(
                "order {order_id} not imported yet, invoice will apply after import"
            )));
        };

        if order.invoice_number.as_deref() == Some(invoice_number.as_str()) {
            return Ok(ProcessOutcome::Skipped(format!(
                "invoice {invoice_number} already attached"
            )));
        }

        self.ctx.orders.set_invoice_number(&order.id, &invoice_number).await?;
        info!(order_id = %order.id, invoice_number = %invoice_number, "attached invoice");
        Ok(ProcessOutcome::Applied)
    }
}
