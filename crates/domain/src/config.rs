//! Configuration structures for the pipeline.
//!
//! Loaded from TOML by the server crate; every struct carries a `Default`
//! matching the domain constants and a `validate()` that rejects values the
//! pipeline cannot run with.

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::{BridgeError, Result};

/// Tuning knobs for the poller, router and rate limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Interval between scheduler ticks, seconds.
    pub poll_interval_secs: u64,
    /// Maximum journal entries requested per poll cycle.
    pub journal_fetch_limit: usize,
    /// Maximum queue items routed per invocation.
    pub router_batch_limit: usize,
    /// Attempts before an item is dead-lettered.
    pub max_retries: u32,
    /// Outbound remote calls allowed per rolling window.
    pub rate_limit_max_calls: usize,
    /// Rolling window length, seconds.
    pub rate_limit_window_secs: u64,
    /// Age after which a `processing` item is swept back to `pending`.
    pub stale_processing_secs: i64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: constants::POLL_INTERVAL_SECS,
            journal_fetch_limit: constants::JOURNAL_FETCH_LIMIT,
            router_batch_limit: constants::ROUTER_BATCH_LIMIT,
            max_retries: constants::MAX_RETRIES,
            rate_limit_max_calls: constants::RATE_LIMIT_MAX_CALLS,
            rate_limit_window_secs: constants::RATE_LIMIT_WINDOW_SECS,
            stale_processing_secs: constants::STALE_PROCESSING_SECS,
        }
    }
}

impl SyncSettings {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(BridgeError::Config("poll_interval_secs must be greater than 0".into()));
        }
        if self.journal_fetch_limit == 0 {
            return Err(BridgeError::Config("journal_fetch_limit must be greater than 0".into()));
        }
        if self.max_retries == 0 {
            return Err(BridgeError::Config("max_retries must be greater than 0".into()));
        }
        if self.rate_limit_max_calls == 0 {
            return Err(BridgeError::Config("rate_limit_max_calls must be greater than 0".into()));
        }
        if self.rate_limit_window_secs == 0 {
            return Err(BridgeError::Config(
                "rate_limit_window_secs must be greater than 0".into(),
            ));
        }
        if self.stale_processing_secs <= 0 {
            return Err(BridgeError::Config(
                "stale_processing_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// One isolated customer workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Stable tenant identifier; scopes all queue and sync-state rows.
    pub id: String,
    /// Per-tenant token for the remote API.
    pub remote_token: String,
    /// Shared secret the remote system presents in `X-Webhook-Token`.
    pub webhook_secret: String,
}

impl TenantConfig {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(BridgeError::Config("tenant id must not be empty".into()));
        }
        if self.remote_token.trim().is_empty() {
            return Err(BridgeError::Config(format!(
                "tenant {} is missing a remote token",
                self.id
            )));
        }
        if self.webhook_secret.trim().is_empty() {
            return Err(BridgeError::Config(format!(
                "tenant {} is missing a webhook secret",
                self.id
            )));
        }
        Ok(())
    }
}
