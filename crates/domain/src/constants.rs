//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! pipeline.

// Queue / router configuration
pub const MAX_RETRIES: u32 = 3;
pub const ROUTER_BATCH_LIMIT: usize = 100;

// Remote API rate limiting (sliding window)
pub const RATE_LIMIT_MAX_CALLS: usize = 95;
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

// Journal polling
pub const POLL_INTERVAL_SECS: u64 = 45;
pub const JOURNAL_FETCH_LIMIT: usize = 100;

// Sync state bookkeeping
pub const MAX_RECORDED_ERRORS: usize = 10;

// Stale `processing` rows are swept back to `pending` after this long
pub const STALE_PROCESSING_SECS: i64 = 600;

// Error strings persisted on queue items are truncated to this length
pub const MAX_ERROR_LEN: usize = 256;
