//! CRM-owned entities the pipeline creates and updates, never deletes.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local 4-state order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Map the remote status vocabulary onto the local lifecycle.
    ///
    /// Unknown codes return `None`; the status-changed processor records a
    /// skip rather than guessing.
    pub fn from_remote_code(code: &str) -> Option<Self> {
        match code {
            "new" | "waiting_for_payment" | "on_hold" => Some(Self::Pending),
            "paid" | "packed" | "ready_to_ship" | "shipped" => Some(Self::Processing),
            "delivered" | "finished" => Some(Self::Completed),
            "cancelled" | "refunded" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// CRM client record.
///
/// Matched by tax id first, then phone, before the pipeline falls back to
/// creating a new row. That ordering is a dedup priority: tax ids are
/// stronger identity evidence than phone numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    /// Aggregate stats, maintained best-effort by the processors.
    pub order_count: i64,
    pub lifetime_value_cents: i64,
    pub created_at: i64,
}

impl Client {
    pub fn new(tenant_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            email: None,
            phone: None,
            tax_id: None,
            order_count: 0,
            lifetime_value_cents: 0,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// CRM order, keyed locally by `id` and globally by
/// `(tenant_id, remote_order_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub tenant_id: String,
    pub remote_order_id: String,
    pub client_id: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub currency: String,
    pub invoice_number: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One product line on an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: String,
    pub order_id: String,
    pub remote_product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Append-only record of a stock movement observed or caused by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLedgerEntry {
    pub id: String,
    pub tenant_id: String,
    pub remote_product_id: String,
    pub delta: i64,
    pub reason: String,
    pub recorded_at: i64,
}

impl StockLedgerEntry {
    pub fn new(
        tenant_id: impl Into<String>,
        remote_product_id: impl Into<String>,
        delta: i64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            remote_product_id: remote_product_id.into(),
            delta,
            reason: reason.into(),
            recorded_at: Utc::now().timestamp(),
        }
    }
}
