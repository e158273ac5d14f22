//! Event router: the queue's state machine.
//!
//! Owns every status transition after enqueue: pending → processing →
//! completed, plus the retry/dead-letter policy. Processors never touch
//! queue state and never decide retries; the router is the single place
//! where backoff and dead-lettering happen.

use std::sync::Arc;

use orderbridge_domain::constants::{MAX_ERROR_LEN, MAX_RETRIES, ROUTER_BATCH_LIMIT};
use orderbridge_domain::{BridgeError, QueueItem, Result, RouterSummary};
use tracing::{debug, info, instrument, warn};

use super::ports::{EventQueue, OperatorNotifier};
use crate::processors::{ProcessOutcome, ProcessorSet};

/// Configuration for the event router.
#[derive(Debug, Clone)]
pub struct EventRouterConfig {
    /// Maximum items handled per invocation.
    pub batch_limit: usize,
    /// Attempts before an item is dead-lettered.
    pub max_retries: u32,
}

impl Default for EventRouterConfig {
    fn default() -> Self {
        Self { batch_limit: ROUTER_BATCH_LIMIT, max_retries: MAX_RETRIES }
    }
}

/// Dispatches queued items to the processor matching their kind.
pub struct EventRouter {
    queue: Arc<dyn EventQueue>,
    processors: ProcessorSet,
    notifier: Arc<dyn OperatorNotifier>,
    config: EventRouterConfig,
}

impl EventRouter {
    pub fn new(
        queue: Arc<dyn EventQueue>,
        processors: ProcessorSet,
        notifier: Arc<dyn OperatorNotifier>,
        config: EventRouterConfig,
    ) -> Self {
        Self { queue, processors, notifier, config }
    }

    /// Process one batch of pending items.
    ///
    /// Retried items count as `failed` in the summary for this invocation;
    /// whether they are re-queued or dead-lettered is queue state.
    #[instrument(skip(self))]
    pub async fn process_pending(&self) -> Result<RouterSummary> {
        let items = self.queue.fetch_pending(self.config.batch_limit).await?;
        if items.is_empty() {
            debug!("no pending queue items");
            return Ok(RouterSummary::default());
        }

        info!(count = items.len(), "routing queue batch");

        let mut summary = RouterSummary::default();
        for item in items {
            // Exactly one worker wins the pickup; losing the race (or seeing
            // an item that is no longer pending) is a no-op.
            if !self.queue.mark_processing(&item.id).await? {
                debug!(item_id = %item.id, "lost pickup race, skipping");
                continue;
            }

            self.route_one(&item, &mut summary).await?;
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "queue batch routed"
        );
        Ok(summary)
    }

    async fn route_one(&self, item: &QueueItem, summary: &mut RouterSummary) -> Result<()> {
        let Some(processor) = self.processors.get(&item.kind) else {
            // Forward compatibility: remote event kinds without a handler are
            // completed as skipped, never treated as an error.
            debug!(item_id = %item.id, kind = %item.kind, "no processor for kind, completing as skipped");
            self.queue.mark_completed(&item.id).await?;
            summary.skipped += 1;
            return Ok(());
        };

        match processor.process(item).await {
            Ok(ProcessOutcome::Applied) => {
                self.queue.mark_completed(&item.id).await?;
                summary.processed += 1;
            }
            Ok(ProcessOutcome::Skipped(reason)) => {
                debug!(item_id = %item.id, kind = %item.kind, reason, "processor skipped item");
                self.queue.mark_completed(&item.id).await?;
                summary.skipped += 1;
            }
            Err(err) => {
                self.handle_failure(item, &err).await?;
                summary.failed += 1;
            }
        }
        Ok(())
    }

    async fn handle_failure(&self, item: &QueueItem, err: &BridgeError) -> Result<()> {
        let attempts = item.retry_count.saturating_add(1);
        let reason = truncate_reason(&err.to_string());

        if err.is_retryable() && attempts < self.config.max_retries {
            warn!(
                item_id = %item.id,
                kind = %item.kind,
                attempts,
                error = %err,
                "processing failed, re-queueing for a later pass"
            );
            self.queue.mark_retry(&item.id, &reason).await?;
            return Ok(());
        }

        warn!(
            item_id = %item.id,
            kind = %item.kind,
            attempts,
            retryable = err.is_retryable(),
            error = %err,
            "processing failed permanently, dead-lettering"
        );
        self.queue.mark_failed(&item.id, &reason).await?;

        // Fire-and-forget: a broken notifier must not mask the original
        // processing failure.
        if let Err(notify_err) = self.notifier.notify_dead_letter(item, &reason).await {
            warn!(item_id = %item.id, error = %notify_err, "dead-letter notification failed");
        }
        Ok(())
    }
}

fn truncate_reason(reason: &str) -> String {
    if reason.len() <= MAX_ERROR_LEN {
        return reason.to_string();
    }

    let mut truncated =
        reason.chars().take(MAX_ERROR_LEN.saturating_sub(3)).collect::<String>();
    truncated.push_str("...");
    truncated
}
