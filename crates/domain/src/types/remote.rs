//! DTOs for the remote order-management system's documented contract.
//!
//! All monetary amounts are integer cents on the wire; the remote API is a
//! method-name-plus-parameter-bag RPC returning JSON.

use serde::{Deserialize, Serialize};

/// One entry of the remote append-only change journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Monotonically increasing journal position.
    pub log_id: i64,
    /// Wire name of the event kind.
    pub kind: String,
    /// Remote order id the entry points at, when order-scoped.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Remote object id for non-order events (e.g. product changes).
    #[serde(default)]
    pub object_id: Option<String>,
}

impl JournalEntry {
    /// Dedup key derived from the journal position.
    pub fn source_event_id(&self) -> String {
        format!("journal:{}", self.log_id)
    }
}

/// Full order detail fetched on demand; the journal entry itself is a thin
/// pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub order_id: String,
    pub status_code: String,
    pub currency: String,
    pub total_cents: i64,
    #[serde(default)]
    pub paid_cents: i64,
    pub client: RemoteClient,
    #[serde(default)]
    pub products: Vec<RemoteOrderProduct>,
}

/// Client block embedded in a remote order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteClient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Dedicated tax id field. Often empty; see
    /// [`crate::utils::tax_id::extract`] for the fallback chain.
    #[serde(default)]
    pub tax_id: Option<String>,
    /// Tax id as entered on the invoice address, when different.
    #[serde(default)]
    pub invoice_tax_id: Option<String>,
    /// Free-text order comment, sometimes carrying a tax id.
    #[serde(default)]
    pub comment: Option<String>,
}

/// One product line of a remote order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteOrderProduct {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub price_cents: i64,
}

/// Remote product record, fetched by the product-changed processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteProduct {
    pub product_id: String,
    pub name: String,
    pub stock: i64,
}
