//! # OrderBridge Common
//!
//! Reusable, domain-agnostic building blocks.
//!
//! Currently this is the resilience layer: rate limiting for outbound calls
//! to third-party systems. Nothing in here knows about orders, tenants, or
//! queues.

pub mod resilience;

pub use resilience::{SlidingWindowConfig, SlidingWindowLimiter};
