//! Watch-event recording
//!
//! The raw event write is the only synchronous, caller-visible persistence
//! step: it either succeeds or the error propagates. Everything downstream
//! (interest update, metrics recompute) is dispatched fire-and-forget;
//! those tasks log their own failures and never fail the original write.

use crate::error::Result;
use crate::models::{WatchEvent, WatchSource};
use crate::services::interest::InterestProfiler;
use crate::services::metrics::MetricsAggregator;
use crate::store::WatchStore;
use crate::tasks::TaskDispatcher;
use chrono::Utc;
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// A skip within the first two seconds reads as active rejection.
const EARLY_SKIP_WINDOW_SECS: f64 = 2.0;

/// Caller-supplied watch data; derived fields are filled in on record.
#[derive(Debug, Clone, Default)]
pub struct WatchEventInput {
    pub watch_duration_secs: f64,
    pub total_duration_secs: f64,
    /// Derived from the duration ratio (capped at 1.0) when absent.
    pub completion_rate: Option<f64>,
    pub replay_count: u32,
    /// Explicit skip flag from the player.
    pub skipped: bool,
    /// When the skip happened, if the player reported it.
    pub skip_time_secs: Option<f64>,
    pub source: WatchSource,
}

/// Result of a batch ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub processed: usize,
    pub failed: usize,
}

/// One event of a batch ingest.
#[derive(Debug, Clone)]
pub struct BatchWatchEvent {
    pub post_id: Uuid,
    pub user_id: Option<Uuid>,
    pub input: WatchEventInput,
}

pub struct WatchTracker {
    watches: Arc<dyn WatchStore>,
    profiler: Arc<InterestProfiler>,
    aggregator: Arc<MetricsAggregator>,
    dispatcher: Arc<dyn TaskDispatcher>,
}

impl WatchTracker {
    pub fn new(
        watches: Arc<dyn WatchStore>,
        profiler: Arc<InterestProfiler>,
        aggregator: Arc<MetricsAggregator>,
        dispatcher: Arc<dyn TaskDispatcher>,
    ) -> Self {
        Self {
            watches,
            profiler,
            aggregator,
            dispatcher,
        }
    }

    /// Persist one watch event, then kick off analytics without blocking.
    ///
    /// The insert's error propagates; the dispatched analytics never do.
    pub async fn record_watch_event(
        &self,
        post_id: Uuid,
        user_id: Option<Uuid>,
        input: WatchEventInput,
    ) -> Result<()> {
        let event = build_event(post_id, user_id, input);
        let completion_rate = event.completion_rate;
        let replayed = event.replay_count > 0;

        self.watches.insert_event(event).await?;
        debug!(%post_id, ?user_id, completion_rate, "Recorded watch event");

        if let Some(user_id) = user_id {
            self.dispatch_interest_update(user_id, post_id, completion_rate, replayed)
                .await;
        }
        self.dispatch_metrics_recompute(post_id).await;

        Ok(())
    }

    /// Bulk-persist a batch in one write, then dispatch one metrics
    /// recompute per distinct post and one interest update per
    /// user-attributed event.
    pub async fn record_watch_events_batch(&self, events: Vec<BatchWatchEvent>) -> BatchOutcome {
        let total = events.len();
        if total == 0 {
            return BatchOutcome {
                processed: 0,
                failed: 0,
            };
        }

        let rows: Vec<WatchEvent> = events
            .iter()
            .map(|e| build_event(e.post_id, e.user_id, e.input.clone()))
            .collect();

        let processed = match self.watches.insert_events(rows).await {
            Ok(written) => written,
            Err(e) => {
                warn!(error = %e, total, "Batch watch insert failed");
                0
            }
        };
        let failed = total - processed;

        debug!(processed, failed, "Batch watch events ingested");

        // Analytics dispatch covers the written prefix.
        let mut recomputed: HashSet<Uuid> = HashSet::new();
        for event in events.iter().take(processed) {
            if let Some(user_id) = event.user_id {
                let completion = derived_completion(&event.input);
                self.dispatch_interest_update(
                    user_id,
                    event.post_id,
                    completion,
                    event.input.replay_count > 0,
                )
                .await;
            }
            if recomputed.insert(event.post_id) {
                self.dispatch_metrics_recompute(event.post_id).await;
            }
        }

        BatchOutcome { processed, failed }
    }

    async fn dispatch_interest_update(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        completion_rate: f64,
        replayed: bool,
    ) {
        let profiler = Arc::clone(&self.profiler);
        self.dispatcher
            .dispatch(
                async move {
                    if let Err(e) = profiler
                        .update_user_interests(user_id, post_id, completion_rate, replayed)
                        .await
                    {
                        warn!(error = %e, %user_id, %post_id, "Background interest update failed");
                    }
                }
                .boxed(),
            )
            .await;
    }

    async fn dispatch_metrics_recompute(&self, post_id: Uuid) {
        let aggregator = Arc::clone(&self.aggregator);
        self.dispatcher
            .dispatch(
                async move {
                    if let Err(e) = aggregator.recompute(post_id).await {
                        warn!(error = %e, %post_id, "Background metrics recompute failed");
                    }
                }
                .boxed(),
            )
            .await;
    }
}

fn derived_completion(input: &WatchEventInput) -> f64 {
    match input.completion_rate {
        Some(rate) => rate.clamp(0.0, 1.0),
        None if input.total_duration_secs > 0.0 => {
            (input.watch_duration_secs / input.total_duration_secs).min(1.0)
        }
        None => 0.0,
    }
}

fn build_event(post_id: Uuid, user_id: Option<Uuid>, input: WatchEventInput) -> WatchEvent {
    let completion_rate = derived_completion(&input);
    // Explicit skip plus an exit inside the first two seconds.
    let skipped_in_first_2s = input.skipped
        && input
            .skip_time_secs
            .unwrap_or(input.watch_duration_secs)
            < EARLY_SKIP_WINDOW_SECS;

    WatchEvent {
        id: Uuid::new_v4(),
        post_id,
        user_id,
        watch_duration_secs: input.watch_duration_secs,
        total_duration_secs: input.total_duration_secs,
        completion_rate,
        replay_count: input.replay_count,
        skipped_in_first_2s,
        source: input.source,
        created_at: Utc::now(),
    }
}
