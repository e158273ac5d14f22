//! Imports a newly created remote order into the CRM.

use chrono::Utc;
use orderbridge_domain::{
    utils::tax_id, BridgeError, Client, EventKind, Order, OrderLineItem, OrderStatus, QueueItem,
    RemoteClient, RemoteOrder, Result, StockLedgerEntry,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use async_trait::async_trait;

use super::{
    best_effort, is_webhook_origin, require_order_id, EventProcessor, ProcessOutcome,
    ProcessorContext,
};

/// Handles `order_created`.
///
/// Fetches the full order from the remote system, resolves or creates the
/// client, inserts the order with its line items, records stock movements and
/// kicks off the post-import messaging. Webhook-delivered items only
/// accelerate orders that already exist locally; creation always waits for
/// the journal entry, whose position the cursor can vouch for.
pub struct OrderCreatedProcessor {
    ctx: ProcessorContext,
}

impl OrderCreatedProcessor {
    pub fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }

    /// Find the client by tax id, then phone, then create one.
    /// Returns the client and whether it was created by this call.
    async fn resolve_client(
        &self,
        tenant_id: &str,
        remote: &RemoteClient,
    ) -> Result<(Client, bool)> {
        if let Some(tax_id) = tax_id::extract(remote) {
            if let Some(existing) = self.ctx.clients.find_by_tax_id(tenant_id, &tax_id).await? {
                debug!(client_id = %existing.id, "matched client by tax id");
                return Ok((existing, false));
            }
        }

        let phone = remote.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
        if let Some(phone) = phone {
            if let Some(existing) = self.ctx.clients.find_by_phone(tenant_id, phone).await? {
                debug!(client_id = %existing.id, "matched client by phone");
                return Ok((existing, false));
            }
        }

        let name = if remote.name.trim().is_empty() { "Unknown" } else { remote.name.trim() };
        let mut client = Client::new(tenant_id, name);
        client.email = remote.email.clone().filter(|e| !e.trim().is_empty());
        client.phone = phone.map(String::from);
        client.tax_id = tax_id::extract(remote);
        self.ctx.clients.insert(&client).await?;
        info!(client_id = %client.id, "created client");
        Ok((client, true))
    }

    fn build_order(&self, tenant_id: &str, client_id: &str, detail: &RemoteOrder) -> Order {
        let now = Utc::now().timestamp();
        Order {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            remote_order_id: detail.order_id.clone(),
            client_id: client_id.to_string(),
            status: OrderStatus::from_remote_code(&detail.status_code)
                .unwrap_or(OrderStatus::Pending),
            total_cents: detail.total_cents,
            paid_cents: detail.paid_cents,
            currency: detail.currency.clone(),
            invoice_number: None,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl EventProcessor for OrderCreatedProcessor {
    fn kind(&self) -> EventKind {
        EventKind::OrderCreated
    }

    #[instrument(skip(self, item), fields(source_event_id = %item.source_event_id))]
    async fn process(&self, item: &QueueItem) -> Result<ProcessOutcome> {
        let order_id = require_order_id(item)?;
        let tenant_id = &item.tenant_id;

        // Existence check before any remote fetch: a redelivered item must
        // not create a second order or a second client.
        if self.ctx.orders.find_by_remote_id(tenant_id, &order_id).await?.is_some() {
            return Ok(ProcessOutcome::Skipped(format!("order {order_id} already imported")));
        }

        if is_webhook_origin(item) {
            return Ok(ProcessOutcome::Skipped(format!(
                "order {order_id} not yet imported, deferring creation to the journal poll"
            )));
        }

        let detail = match self.ctx.remote.fetch_order(tenant_id, &order_id).await {
            Ok(detail) => detail,
            Err(BridgeError::NotFound(_)) => {
                return Ok(ProcessOutcome::Skipped(format!(
                    "order {order_id} not visible on the remote side yet"
                )));
            }
            Err(err) => return Err(err),
        };

        let (client, created) = self.resolve_client(tenant_id, &detail.client).await?;

        let order = self.build_order(tenant_id, &client.id, &detail);
        let lines: Vec<OrderLineItem> = detail
            .products
            .iter()
            .map(|p| OrderLineItem {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                remote_product_id: p.product_id.clone(),
                name: p.name.clone(),
                quantity: p.quantity,
                unit_price_cents: p.price_cents,
            })
            .collect();
        self.ctx.orders.insert(&order, &lines).await?;
        info!(order_id = %order.id, remote_order_id = %order.remote_order_id, lines = lines.len(), "imported order");

        // Everything below is secondary: the order is in, failures here must
        // not push the item back into retry.
        for line in &lines {
            let entry = StockLedgerEntry::new(
                tenant_id.clone(),
                line.remote_product_id.clone(),
                -line.quantity,
                format!("order {}", order.remote_order_id),
            );
            best_effort(self.ctx.stock.record(&entry).await, "stock ledger entry");
            best_effort(
                self.ctx.remote.update_stock(tenant_id, &line.remote_product_id, -line.quantity).await,
                "remote stock push",
            );
        }

        if created {
            best_effort(self.ctx.messaging.send_welcome(tenant_id, &client).await, "welcome message");
        }
        best_effort(self.ctx.messaging.send_upsell(tenant_id, &order).await, "upsell message");
        best_effort(
            self.ctx.messaging.schedule_reorder_reminder(tenant_id, &order).await,
            "reorder reminder",
        );
        best_effort(
            self.ctx.clients.add_order_stats(&client.id, order.total_cents).await,
            "client order stats",
        );

        Ok(ProcessOutcome::Applied)
    }
}
