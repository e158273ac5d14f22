//! Interval-driven worker that keeps the pipeline moving.
//!
//! Each tick polls every configured tenant's journal, routes the pending
//! queue batch, and sweeps stale `processing` rows back to `pending`.
//! Lifecycle follows the start/stop/cancellation-token shape used by the
//! other background workers.

use std::sync::Arc;
use std::time::Duration;

use orderbridge_core::{EventQueue, EventRouter, JournalPoller};
use orderbridge_domain::constants::{POLL_INTERVAL_SECS, STALE_PROCESSING_SECS};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the poll scheduler.
#[derive(Debug, Clone)]
pub struct PollSchedulerConfig {
    /// Pause between ticks.
    pub interval: Duration,
    /// Upper bound for one whole tick.
    pub tick_timeout: Duration,
    /// `processing` rows older than this are swept back to `pending`.
    pub stale_after_secs: i64,
}

impl Default for PollSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(POLL_INTERVAL_SECS),
            tick_timeout: Duration::from_secs(300),
            stale_after_secs: STALE_PROCESSING_SECS,
        }
    }
}

/// Context for the tick loop to avoid too many arguments (clippy)
struct TickContext {
    poller: Arc<JournalPoller>,
    router: Arc<EventRouter>,
    queue: Arc<dyn EventQueue>,
    tenants: Vec<String>,
}

/// Background scheduler driving poll → route → sweep ticks.
pub struct PollScheduler {
    poller: Arc<JournalPoller>,
    router: Arc<EventRouter>,
    queue: Arc<dyn EventQueue>,
    tenants: Vec<String>,
    config: PollSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl PollScheduler {
    pub fn new(
        poller: Arc<JournalPoller>,
        router: Arc<EventRouter>,
        queue: Arc<dyn EventQueue>,
        tenants: Vec<String>,
        config: PollSchedulerConfig,
    ) -> Self {
        Self {
            poller,
            router,
            queue,
            tenants,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler is already running.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(tenants = self.tenants.len(), "starting poll scheduler");

        // A fresh token supports restart after stop.
        self.cancellation_token = CancellationToken::new();

        let context = TickContext {
            poller: Arc::clone(&self.poller),
            router: Arc::clone(&self.router),
            queue: Arc::clone(&self.queue),
            tenants: self.tenants.clone(),
        };
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::tick_loop(context, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!("poll scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler is not running.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("stopping poll scheduler");

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = Duration::from_secs(5);
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("poll scheduler stopped");
        Ok(())
    }

    /// Whether the background task is alive.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn tick_loop(
        context: TickContext,
        config: PollSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("tick loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.interval) => {
                    let tick = Self::run_tick(&context, &config);
                    if tokio::time::timeout(config.tick_timeout, tick).await.is_err() {
                        error!(timeout_secs = config.tick_timeout.as_secs(), "tick timed out");
                    }
                }
            }
        }
    }

    async fn run_tick(context: &TickContext, config: &PollSchedulerConfig) {
        let failures = context.poller.poll_all(&context.tenants).await;
        for (tenant_id, err) in &failures {
            warn!(tenant_id, error = %err, "journal poll failed this tick");
        }

        match context.router.process_pending().await {
            Ok(summary) => {
                if summary.processed + summary.skipped + summary.failed > 0 {
                    info!(
                        processed = summary.processed,
                        skipped = summary.skipped,
                        failed = summary.failed,
                        "routed queue batch"
                    );
                }
            }
            Err(err) => error!(error = %err, "queue routing failed this tick"),
        }

        match context.queue.requeue_stale(config.stale_after_secs).await {
            Ok(0) => {}
            Ok(count) => warn!(count, "requeued stale processing items"),
            Err(err) => error!(error = %err, "stale sweep failed this tick"),
        }
    }
}

/// Ensure the background task is cancelled when dropped.
impl Drop for PollScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            warn!("PollScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}
