//! Per-post engagement metrics and the distribution-phase state machine
//!
//! Every recompute rebuilds the full metrics row from the trailing 7-day
//! window of raw watch events, so concurrent recomputes are idempotent and
//! last-write-wins. The phase machine only moves forward: a post proves
//! itself out of TEST into SCALE and BLAST, or dies in TEST.

use crate::error::Result;
use crate::models::{DistributionPhase, PostMetrics, WatchEvent};
use crate::store::{EngagementCounters, MetricsStore, WatchStore};
use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Trailing window of watch events feeding each recompute.
const METRICS_WINDOW_DAYS: i64 = 7;

// Viral-score blend weights.
const VIRAL_COMPLETION_WEIGHT: f64 = 0.4;
const VIRAL_REPLAY_WEIGHT: f64 = 0.3;
const VIRAL_SAVE_WEIGHT: f64 = 0.2;
const VIRAL_SHARE_WEIGHT: f64 = 0.1;

// TEST -> SCALE thresholds.
const SCALE_MIN_VIEWS: u64 = 100;
const SCALE_MIN_COMPLETION: f64 = 0.6;
const SCALE_MAX_SKIP: f64 = 0.3;
// TEST -> KILLED thresholds.
const KILL_MAX_COMPLETION: f64 = 0.3;
const KILL_MIN_SKIP: f64 = 0.5;
// SCALE -> BLAST thresholds.
const BLAST_MIN_VIEWS: u64 = 5000;
const BLAST_MIN_COMPLETION: f64 = 0.7;
const BLAST_MIN_VIRAL: f64 = 0.5;

pub struct MetricsAggregator {
    watches: Arc<dyn WatchStore>,
    metrics: Arc<dyn MetricsStore>,
    engagement: Arc<dyn EngagementCounters>,
}

impl MetricsAggregator {
    pub fn new(
        watches: Arc<dyn WatchStore>,
        metrics: Arc<dyn MetricsStore>,
        engagement: Arc<dyn EngagementCounters>,
    ) -> Self {
        Self {
            watches,
            metrics,
            engagement,
        }
    }

    /// Full recompute of a post's metrics row. No-op when the window holds
    /// no events.
    pub async fn recompute(&self, post_id: Uuid) -> Result<()> {
        let now = Utc::now();
        let since = now - Duration::days(METRICS_WINDOW_DAYS);
        let events = self.watches.events_for_post(post_id, since).await?;

        if events.is_empty() {
            debug!(%post_id, "No watch events in window; skipping recompute");
            return Ok(());
        }

        let total_views = events.len() as u64;
        let distinct_users: HashSet<Uuid> =
            events.iter().filter_map(|e| e.user_id).collect();
        // All-anonymous traffic conflates volume with reach on purpose:
        // downstream rate math depends on this fallback.
        let unique_views = if distinct_users.is_empty() {
            total_views
        } else {
            distinct_users.len() as u64
        };

        let avg_watch_time_secs = mean(&events, |e| e.watch_duration_secs);
        let completion_rate = mean(&events, |e| e.completion_rate);
        let replay_rate = fraction(&events, |e| e.replay_count > 0);
        let skip_rate = fraction(&events, |e| e.skipped_in_first_2s);

        let counts = self.engagement.counts(post_id).await?;
        let like_rate = counts.likes as f64 / unique_views as f64;
        let comment_rate = counts.comments as f64 / unique_views as f64;
        let share_rate = counts.shares as f64 / unique_views as f64;
        let save_rate = counts.saves as f64 / unique_views as f64;

        let viral_score = completion_rate * VIRAL_COMPLETION_WEIGHT
            + replay_rate * VIRAL_REPLAY_WEIGHT
            + save_rate * VIRAL_SAVE_WEIGHT
            + share_rate * VIRAL_SHARE_WEIGHT;

        let current_phase = self
            .metrics
            .metrics(post_id)
            .await?
            .map(|m| m.distribution_phase)
            .unwrap_or(DistributionPhase::Test);
        let next_phase =
            advance_phase(current_phase, total_views, completion_rate, skip_rate, viral_score);

        if next_phase != current_phase {
            info!(
                %post_id,
                from = ?current_phase,
                to = ?next_phase,
                total_views,
                completion_rate,
                "Distribution phase advanced"
            );
        }

        self.metrics
            .upsert_metrics(PostMetrics {
                post_id,
                total_views,
                unique_views,
                avg_watch_time_secs,
                completion_rate,
                replay_rate,
                like_rate,
                comment_rate,
                share_rate,
                save_rate,
                skip_rate,
                viral_score,
                distribution_phase: next_phase,
                last_calculated_at: now,
            })
            .await
    }
}

/// The phase state machine. Forward-only; Blast and Killed are terminal.
fn advance_phase(
    current: DistributionPhase,
    total_views: u64,
    completion_rate: f64,
    skip_rate: f64,
    viral_score: f64,
) -> DistributionPhase {
    match current {
        DistributionPhase::Test => {
            if total_views >= SCALE_MIN_VIEWS
                && completion_rate >= SCALE_MIN_COMPLETION
                && skip_rate < SCALE_MAX_SKIP
            {
                DistributionPhase::Scale
            } else if completion_rate < KILL_MAX_COMPLETION || skip_rate > KILL_MIN_SKIP {
                DistributionPhase::Killed
            } else {
                DistributionPhase::Test
            }
        }
        DistributionPhase::Scale => {
            if total_views >= BLAST_MIN_VIEWS
                && completion_rate >= BLAST_MIN_COMPLETION
                && viral_score >= BLAST_MIN_VIRAL
            {
                DistributionPhase::Blast
            } else {
                DistributionPhase::Scale
            }
        }
        terminal => terminal,
    }
}

fn mean(events: &[WatchEvent], f: impl Fn(&WatchEvent) -> f64) -> f64 {
    events.iter().map(&f).sum::<f64>() / events.len() as f64
}

fn fraction(events: &[WatchEvent], pred: impl Fn(&WatchEvent) -> bool) -> f64 {
    events.iter().filter(|e| pred(e)).count() as f64 / events.len() as f64
}
