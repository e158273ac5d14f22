//! # OrderBridge Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the queue, sync state, CRM
//!   repositories, remote API and messaging collaborators
//! - The journal poller and the event router
//! - One event processor per remote event kind
//!
//! ## Architecture Principles
//! - Only depends on `orderbridge-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod processors;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use processors::{EventProcessor, ProcessOutcome, ProcessorContext, ProcessorSet};
pub use sync::poller::{JournalPoller, PollReport};
pub use sync::ports::{
    ClientRepository, EventQueue, MessagingGateway, OperatorNotifier, OrderRepository,
    RemoteOrderApi, StockLedger, SyncStateStore,
};
pub use sync::router::{EventRouter, EventRouterConfig};
