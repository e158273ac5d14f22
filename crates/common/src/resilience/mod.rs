//! Resilience patterns for fault tolerance
//!
//! This module provides a **sliding window** rate limiter: the caller is
//! suspended, never rejected, until issuing one more call stays inside the
//! configured budget. That matches API vendors that count requests over a
//! rolling interval rather than refilling tokens.

pub mod rate_limiter;

pub use rate_limiter::{SlidingWindowConfig, SlidingWindowConfigBuilder, SlidingWindowLimiter};
