//! Sliding window rate limiter for outbound API calls
//!
//! Keeps the timestamps of recent calls; a new call is admitted once fewer
//! than `max_calls` timestamps remain inside the rolling window. A saturated
//! window suspends the caller until the oldest timestamp ages out, then
//! re-checks: the computed wait can be stale by the time the task resumes,
//! so admission is only ever decided under the lock.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Configuration for the sliding window limiter
#[derive(Debug, Clone)]
pub struct SlidingWindowConfig {
    /// Maximum number of calls admitted per rolling window
    pub max_calls: usize,
    /// Length of the rolling window
    pub window: Duration,
}

impl Default for SlidingWindowConfig {
    fn default() -> Self {
        Self { max_calls: 95, window: Duration::from_secs(60) }
    }
}

impl SlidingWindowConfig {
    /// Create a new configuration builder
    pub fn builder() -> SlidingWindowConfigBuilder {
        SlidingWindowConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_calls == 0 {
            return Err("max_calls must be greater than 0".to_string());
        }
        if self.window.is_zero() {
            return Err("window must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Builder for [`SlidingWindowConfig`]
#[derive(Debug)]
pub struct SlidingWindowConfigBuilder {
    config: SlidingWindowConfig,
}

impl Default for SlidingWindowConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SlidingWindowConfigBuilder {
    pub fn new() -> Self {
        Self { config: SlidingWindowConfig::default() }
    }

    pub fn max_calls(mut self, max_calls: usize) -> Self {
        self.config.max_calls = max_calls;
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    pub fn build(self) -> Result<SlidingWindowConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Sliding window rate limiter
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use orderbridge_common::resilience::SlidingWindowLimiter;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let limiter = SlidingWindowLimiter::new(95, Duration::from_secs(60))?;
///
/// // Suspends until a call slot is free, then records the call.
/// limiter.acquire().await;
/// # Ok(())
/// # }
/// ```
pub struct SlidingWindowLimiter {
    config: SlidingWindowConfig,
    calls: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// Create a new limiter admitting `max_calls` per `window`.
    pub fn new(max_calls: usize, window: Duration) -> Result<Self, String> {
        Self::with_config(SlidingWindowConfig { max_calls, window })
    }

    /// Create a new limiter from a validated configuration.
    pub fn with_config(config: SlidingWindowConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self { calls: Mutex::new(VecDeque::with_capacity(config.max_calls)), config })
    }

    /// Suspend until one more call is safe, then record it.
    ///
    /// The only side effect is delay; errors cannot occur here.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut calls = self.calls.lock().await;
                let now = Instant::now();
                Self::prune(&mut calls, now, self.config.window);

                if calls.len() < self.config.max_calls {
                    calls.push_back(now);
                    trace!(in_window = calls.len(), "rate limiter admitted call");
                    return;
                }

                match calls.front() {
                    Some(oldest) => {
                        self.config.window.saturating_sub(now.duration_since(*oldest))
                    }
                    // Unreachable with max_calls > 0, but do not block forever.
                    None => Duration::ZERO,
                }
            };

            debug!(wait_ms = wait.as_millis() as u64, "rate limiter window saturated, waiting");
            tokio::time::sleep(wait).await;
            // Loop and re-check: other tasks may have filled the freed slot
            // while we slept.
        }
    }

    /// Number of call slots currently free.
    pub async fn available(&self) -> usize {
        let mut calls = self.calls.lock().await;
        Self::prune(&mut calls, Instant::now(), self.config.window);
        self.config.max_calls - calls.len()
    }

    /// Forget all recorded calls.
    pub async fn reset(&self) {
        self.calls.lock().await.clear();
    }

    fn prune(calls: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while calls.front().is_some_and(|t| now.duration_since(*t) >= window) {
            calls.pop_front();
        }
    }
}
