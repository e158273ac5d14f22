//! Attaches a shipment tracking number to the local order.

use async_trait::async_trait;
use orderbridge_domain::{EventKind, QueueItem, Result};
use tracing::{info, instrument};

use super::{object_id, require_order_id, EventProcessor, ProcessOutcome, ProcessorContext};

/// Handles `package_created`.
///
/// The journal entry's `object_id` is the carrier tracking number.
pub struct PackageCreatedProcessor {
    ctx: ProcessorContext,
}

impl PackageCreatedProcessor {
    pub fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventProcessor for PackageCreatedProcessor {
    fn kind(&self) -> EventKind {
        EventKind::PackageCreated
    }

    #[instrument(skip(self, item), fields(source_event_id = %item.source_event_id))]
    async fn process(&self, item: &QueueItem) -> Result<ProcessOutcome> {
        let order_id = require_order_id(item)?;
        let Some(tracking_number) = object_id(item)? else {
            return Ok(ProcessOutcome::Skipped(format!(
                "push for order {order_id} carries no tracking number, \
                 the journal copy will attach it"
            )));
        };
        let tenant_id = &item.tenant_id;

        let Some(order) = self.ctx.orders.find_by_remote_id(tenant_id, &order_id).await? else {
            return Ok(ProcessOutcome::Skipped(format!(
                "order {order_id} not imported yet, tracking will apply after import"
            )));
        };

        if order.tracking_number.as_deref() == Some(tracking_number.as_str()) {
            return Ok(ProcessOutcome::Skipped(format!(
                "tracking {tracking_number} already attached"
            )));
        }

        self.ctx.orders.set_tracking_number(&order.id, &tracking_number).await?;
        info!(order_id = %order.id, tracking_number = %tracking_number, "attached tracking number");
        Ok(ProcessOutcome::Applied)
    }
}
