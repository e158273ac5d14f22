//! Remote order-management system access.
//!
//! Every outbound call goes through [`RemoteApiClient`], the single
//! chokepoint that owns the rate limiter and the error normalization.

mod client;

pub use client::{RemoteApiClient, RemoteApiConfig};
