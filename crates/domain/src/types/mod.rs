//! Domain types and models

pub mod crm;
pub mod remote;
pub mod sync;

pub use crm::{Client, Order, OrderLineItem, OrderStatus, StockLedgerEntry};
pub use remote::{JournalEntry, RemoteClient, RemoteOrder, RemoteOrderProduct, RemoteProduct};
pub use sync::{EventKind, QueueItem, QueueItemStatus, RouterSummary, SyncState};
