//! sqlite persistence layer.
//!
//! All repositories share one [`DbManager`] pool and run their statements on
//! blocking tasks.

mod client_repository;
mod manager;
mod order_repository;
mod queue_repository;
mod stock_repository;
mod sync_state_repository;

pub use client_repository::SqliteClientRepository;
pub use manager::DbManager;
pub use order_repository::SqliteOrderRepository;
pub use queue_repository::SqliteEventQueue;
pub use stock_repository::SqliteStockLedger;
pub use sync_state_repository::SqliteSyncStateStore;
