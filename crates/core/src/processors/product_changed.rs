//! Reconciles a remote product's stock level into the local ledger.

use async_trait::async_trait;
use orderbridge_domain::{BridgeError, EventKind, QueueItem, Result, StockLedgerEntry};
use tracing::{info, instrument};

use super::{object_id, EventProcessor, ProcessOutcome, ProcessorContext};

/// Handles `product_changed`.
///
/// The ledger tracks movements, not snapshots, so the processor records the
/// difference between the remote level and the ledger's net level. A rerun
/// sees a zero difference and records nothing, which is what makes the
/// operation idempotent.
pub struct ProductChangedProcessor {
    ctx: ProcessorContext,
}

impl ProductChangedProcessor {
    pub fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventProcessor for ProductChangedProcessor {
    fn kind(&self) -> EventKind {
        EventKind::ProductChanged
    }

    #[instrument(skip(self, item), fields(source_event_id = %item.source_event_id))]
    async fn process(&self, item: &QueueItem) -> Result<ProcessOutcome> {
        let Some(product_id) = object_id(item)? else {
            return Ok(ProcessOutcome::Skipped(
                "push carries no product id, the journal copy will reconcile it".to_string(),
            ));
        };
        let tenant_id = &item.tenant_id;

        let product = match self.ctx.remote.fetch_product(tenant_id, &product_id).await {
            Ok(product) => product,
            Err(BridgeError::NotFound(_)) => {
                return Ok(ProcessOutcome::Skipped(format!(
                    "product {product_id} no longer visible on the remote side"
                )));
            }
            Err(err) => return Err(err),
        };

        let known = self.ctx.stock.recorded_level(tenant_id, &product_id).await?;
        let delta = product.stock - known;
        if delta == 0 {
            return Ok(ProcessOutcome::Skipped(format!(
                "product {product_id} stock already at {known}"
            )));
        }

        let entry = StockLedgerEntry::new(
            tenant_id.clone(),
            product_id.clone(),
            delta,
            "remote adjustment",
        );
        self.ctx.stock.record(&entry).await?;
        info!(product_id = %product_id, delta, level = product.stock, "recorded stock adjustment");
        Ok(ProcessOutcome::Applied)
    }
}
