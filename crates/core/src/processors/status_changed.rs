//! Mirrors a remote status transition onto the local order.

use async_trait::async_trait;
use orderbridge_domain::{BridgeError, EventKind, OrderStatus, QueueItem, Result};
use tracing::{info, instrument};

use super::{require_order_id, EventProcessor, ProcessOutcome, ProcessorContext};

/// Handles `status_changed`.
///
/// The new status is read from a fresh order fetch rather than the event
/// payload, so a burst of rapid transitions converges on the latest remote
/// state no matter the processing order. Unknown remote codes are skipped,
/// never guessed.
pub struct StatusChangedProcessor {
    ctx: ProcessorContext,
}

impl StatusChangedProcessor {
    pub fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventProcessor for StatusChangedProcessor {
    fn kind(&self) -> EventKind {
        EventKind::StatusChanged
    }

    #[instrument(skip(self, item), fields(source_event_id = %item.source_event_id))]
    async fn process(&self, item: &QueueItem) -> Result<ProcessOutcome> {
        let order_id = require_order_id(item)?;
        let tenant_id = &item.tenant_id;

        let Some(order) = self.ctx.orders.find_by_remote_id(tenant_id, &order_id).await? else {
            return Ok(ProcessOutcome::Skipped(format!(
                "order {order_id} not imported yet, status will come with the import"
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

        let Some(status) = OrderStatus::from_remote_code(&detail.status_code) else {
            return Ok(ProcessOutcome::Skipped(format!(
                "unknown remote status code {:?}",
                detail.status_code
            )));
        };

        if status == order.status {
            return Ok(ProcessOutcome::Skipped(format!("order already {status}")));
        }

        self.ctx.orders.update_status(&order.id, status).await?;
        info!(order_id = %order.id, from = %order.status, to = %status, "updated order status");
        Ok(ProcessOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use orderbridge_domain::{Order, RemoteClient, RemoteOrder};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::processors::test_support::context;

    fn local_order(remote_order_id: &str, status: OrderStatus) -> Order {
        let now = Utc::now().timestamp();
        Order {
            id: Uuid::new_v4().to_string(),
            tenant_id: "tenant-1".to_string(),
            remote_order_id: remote_order_id.to_string(),
            client_id: Uuid::new_v4().to_string(),
            status,
            total_cents: 1_000,
            paid_cents: 0,
            currency: "EUR".to_string(),
            invoice_number: None,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn remote_with_status(order_id: &str, status_code: &str) -> RemoteOrder {
        RemoteOrder {
            order_id: order_id.to_string(),
            status_code: status_code.to_string(),
            currency: "EUR".to_string(),
            total_cents: 1_000,
            paid_cents: 0,
            client: RemoteClient::default(),
            products: Vec::new(),
        }
    }

    fn item(order_id: &str) -> QueueItem {
        QueueItem::new(
            "tenant-1",
            "journal:303",
            EventKind::StatusChanged,
            Some(order_id.to_string()),
            json!({"log_id": 303, "order_id": order_id}),
        )
    }

    #[tokio::test]
    async fn mirrors_remote_status_onto_local_order() {
        let (ctx, fakes) = context();
        fakes.orders.rows.lock().unwrap().push(local_order("555", OrderStatus::Pending));
        fakes.remote.orders.lock().unwrap().push(remote_with_status("555", "shipped"));
        let processor = StatusChangedProcessor::new(ctx);

        let outcome = processor.process(&item("555")).await.unwrap();

        assert_eq!(outcome, ProcessOutcome::Applied);
        assert_eq!(fakes.orders.rows.lock().unwrap()[0].status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn unknown_remote_code_is_skipped() {
        let (ctx, fakes) = context();
        fakes.orders.rows.lock().unwrap().push(local_order("555", OrderStatus::Pending));
        fakes.remote.orders.lock().unwrap().push(remote_with_status("555", "teleported"));
        let processor = StatusChangedProcessor::new(ctx);

        let outcome = processor.process(&item("555")).await.unwrap();

        assert!(matches!(outcome, ProcessOutcome::Skipped(_)));
        assert_eq!(fakes.orders.rows.lock().unwrap()[0].status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn unchanged_status_is_a_noop() {
        let (ctx, fakes) = context();
        fakes.orders.rows.lock().unwrap().push(local_order("555", OrderStatus::Processing));
        fakes.remote.orders.lock().unwrap().push(remote_with_status("555", "packed"));
        let processor = StatusChangedProcessor::new(ctx);

        let outcome = processor.process(&item("555")).await.unwrap();

        assert!(matches!(outcome, ProcessOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn unknown_local_order_is_skipped() {
        let (ctx, _fakes) = context();
        let processor = StatusChangedProcessor::new(ctx);

        let outcome = processor.process(&item("ghost")).await.unwrap();

        assert!(matches!(outcome, ProcessOutcome::Skipped(_)));
    }
}
