//! Daily maintenance jobs
//!
//! Wraps the three cron entry points (interest decay, spam-signal decay,
//! expired-ban sweep) in a single sequential cycle. The loop runs one
//! cycle at a time, so a slow cycle delays the next rather than
//! overlapping it.

use crate::services::{InterestProfiler, TrustScorer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info};

/// Maintenance cadence. The decay formulas assume one run per day;
/// changing this changes their effective half-life.
const CYCLE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Run one maintenance cycle: interest decay, spam decay, ban expiry.
///
/// Each job logs and absorbs its own per-row failures; a job-level error
/// is logged here and does not stop the remaining jobs.
pub async fn run_maintenance_cycle(profiler: &InterestProfiler, trust: &TrustScorer) {
    if let Err(e) = profiler.apply_interest_decay().await {
        error!(error = %e, "Interest decay job failed");
    }

    match trust.decay_spam_signals().await {
        Ok(outcome) => info!(processed = outcome.processed, "Spam decay job done"),
        Err(e) => error!(error = %e, "Spam decay job failed"),
    }

    match trust.check_expired_shadow_bans().await {
        Ok(outcome) => info!(expired = outcome.expired, "Ban expiry sweep done"),
        Err(e) => error!(error = %e, "Ban expiry sweep failed"),
    }
}

/// Long-running daily loop around [`run_maintenance_cycle`].
pub async fn start_maintenance_job(profiler: Arc<InterestProfiler>, trust: Arc<TrustScorer>) {
    info!(
        interval_hours = CYCLE_INTERVAL.as_secs() / 3600,
        "Starting maintenance job"
    );

    loop {
        sleep(CYCLE_INTERVAL).await;

        let cycle_start = Instant::now();
        run_maintenance_cycle(&profiler, &trust).await;
        info!(
            duration_ms = cycle_start.elapsed().as_millis(),
            "Maintenance cycle complete"
        );
    }
}
