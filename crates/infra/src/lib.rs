//! # OrderBridge Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - sqlite-backed repositories (queue, sync state, clients, orders, stock)
//! - the rate-limited remote API client
//! - the outbound messaging/notification client
//! - the poll scheduler driving the pipeline
//!
//! ## Architecture
//! - Implements traits defined in `orderbridge-core`
//! - Contains all "impure" code (I/O, HTTP, database)

pub mod database;
pub mod errors;
pub mod notify;
pub mod remote;
pub mod scheduling;

pub use database::{
    DbManager, SqliteClientRepository, SqliteEventQueue, SqliteOrderRepository,
    SqliteStockLedger, SqliteSyncStateStore,
};
pub use errors::InfraError;
pub use notify::{MessagingClient, MessagingClientConfig};
pub use remote::{RemoteApiClient, RemoteApiConfig};
pub use scheduling::{PollScheduler, PollSchedulerConfig, SchedulerError};
