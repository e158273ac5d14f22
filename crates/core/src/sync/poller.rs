//! Journal poller: pulls the remote change journal forward per tenant.
//!
//! One poll cycle per tenant at a time, enforced by the `in_progress` flag in
//! the sync state store. The flag is always released, success or error, and
//! the cursor only ever moves forward.

use std::sync::Arc;

use orderbridge_domain::{BridgeError, EventKind, QueueItem, Result, SyncState};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::ports::{EventQueue, RemoteOrderApi, SyncStateStore};

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Queue items actually inserted.
    pub enqueued: usize,
    /// Journal entries skipped because their dedup key was already known
    /// (typically webhook-delivered first).
    pub duplicates: usize,
    /// Cursor after the cycle.
    pub cursor: i64,
}

/// Periodic journal poller.
pub struct JournalPoller {
    remote: Arc<dyn RemoteOrderApi>,
    queue: Arc<dyn EventQueue>,
    state_store: Arc<dyn SyncStateStore>,
    fetch_limit: usize,
}

impl JournalPoller {
    pub fn new(
        remote: Arc<dyn RemoteOrderApi>,
        queue: Arc<dyn EventQueue>,
        state_store: Arc<dyn SyncStateStore>,
        fetch_limit: usize,
    ) -> Self {
        Self { remote, queue, state_store, fetch_limit }
    }

    /// Run one poll cycle for a tenant.
    ///
    /// Returns `None` when another cycle already holds the `in_progress`
    /// flag; in that case no remote call is made.
    #[instrument(skip(self))]
    pub async fn run_once(&self, tenant_id: &str) -> Result<Option<PollReport>> {
        let Some(state) = self.state_store.begin_poll(tenant_id).await? else {
            debug!(tenant_id, "poll cycle already in progress, skipping");
            return Ok(None);
        };

        // The flag is held from here on; finish_poll releases it on every
        // path, mirroring a finally block.
        let outcome = self.fetch_and_enqueue(&state).await;

        match outcome {
            Ok(report) => {
                let advanced = (report.cursor > state.cursor).then_some(report.cursor);
                self.state_store.finish_poll(tenant_id, advanced, None).await?;
                info!(
                    tenant_id,
                    enqueued = report.enqueued,
                    duplicates = report.duplicates,
                    cursor = report.cursor,
                    "poll cycle completed"
                );
                Ok(Some(report))
            }
            Err(err) => {
                warn!(tenant_id, error = %err, "poll cycle failed, cursor left unchanged");
                // Release must win over error reporting: if it fails too,
                // surface the release failure, it is the more serious one.
                self.state_store.finish_poll(tenant_id, None, Some(&err.to_string())).await?;
                Err(err)
            }
        }
    }

    /// Poll every tenant, collecting per-tenant errors instead of aborting
    /// the sweep. Returns the tenants that failed.
    pub async fn poll_all(&self, tenant_ids: &[String]) -> Vec<(String, BridgeError)> {
        let mut failures = Vec::new();
        for tenant_id in tenant_ids {
            if let Err(err) = self.run_once(tenant_id).await {
                failures.push((tenant_id.clone(), err));
            }
        }
        failures
    }

    async fn fetch_and_enqueue(&self, state: &SyncState) -> Result<PollReport> {
        let entries = self
            .remote
            .fetch_journal(
                &state.tenant_id,
                state.cursor,
                EventKind::processable(),
                self.fetch_limit,
            )
            .await?;

        if entries.is_empty() {
            debug!(tenant_id = %state.tenant_id, cursor = state.cursor, "journal is quiet");
            return Ok(PollReport { enqueued: 0, duplicates: 0, cursor: state.cursor });
        }

        let mut enqueued = 0_usize;
        let mut duplicates = 0_usize;
        let mut max_log_id = state.cursor;

        for entry in &entries {
            max_log_id = max_log_id.max(entry.log_id);

            let kind = EventKind::from(entry.kind.clone());
            if !kind.is_handled() {
                // The journal call filters by kind, but a remote that returns
                // extra kinds anyway must not grow the queue.
                debug!(kind = %kind, log_id = entry.log_id, "ignoring journal entry without processor");
                continue;
            }

            let item = QueueItem::new(
                &state.tenant_id,
                entry.source_event_id(),
                kind,
                entry.order_id.clone(),
                json!({
                    "log_id": entry.log_id,
                    "order_id": entry.order_id,
                    "object_id": entry.object_id,
                }),
            );

            if self.queue.enqueue(&item).await? {
                enqueued += 1;
            } else {
                duplicates += 1;
            }
        }

        Ok(PollReport { enqueued, duplicates, cursor: max_log_id })
    }
}
