//! Creator trust scoring and shadow bans
//!
//! Trust starts maximal at account creation and only degrades through
//! observed signals: posting velocity, bot-like engagement patterns, skip
//! rates, and reports. A trust score under the ban threshold shadow-bans
//! the creator for a bounded window; bans lift lazily on read or eagerly
//! via the daily sweep.

use crate::config::TrustConfig;
use crate::error::Result;
use crate::models::{CreatorTrustScore, PostMetrics};
use crate::store::{MetricsStore, PostCatalog, TrustStore};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Spam bump for posting more than this many times in the trailing hour.
const VELOCITY_POST_LIMIT: u64 = 5;
const VELOCITY_SPAM_BUMP: f64 = 0.2;
/// Extra spam bump for the bot-like like/completion pattern.
const BOT_PATTERN_SPAM_BUMP: f64 = 0.1;
/// How many of the creator's most recent posts feed the quality factors.
const RECENT_METRICS_WINDOW: usize = 10;
/// Daily multiplicative decay applied to accumulated spam signals.
const SPAM_DECAY: f64 = 0.9;

/// Outcome of the spam-signal decay sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayOutcome {
    pub processed: usize,
}

/// Outcome of the expired-ban sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirySweepOutcome {
    pub expired: usize,
}

pub struct TrustScorer {
    trust: Arc<dyn TrustStore>,
    metrics: Arc<dyn MetricsStore>,
    catalog: Arc<dyn PostCatalog>,
    config: TrustConfig,
}

impl TrustScorer {
    pub fn new(
        trust: Arc<dyn TrustStore>,
        metrics: Arc<dyn MetricsStore>,
        catalog: Arc<dyn PostCatalog>,
        config: TrustConfig,
    ) -> Self {
        Self {
            trust,
            metrics,
            catalog,
            config,
        }
    }

    /// Idempotent create at full trust. Called at user creation.
    pub async fn initialize_creator_trust_score(&self, user_id: Uuid) -> Result<()> {
        if self.trust.trust_score(user_id).await?.is_some() {
            return Ok(());
        }
        self.trust
            .upsert_trust_score(CreatorTrustScore::new(user_id))
            .await
    }

    /// Stored trust row, if any.
    pub async fn creator_trust_score(&self, user_id: Uuid) -> Result<Option<CreatorTrustScore>> {
        self.trust.trust_score(user_id).await
    }

    /// Recompute all trust factors from observed data and re-evaluate the
    /// shadow-ban decision.
    pub async fn update_creator_trust_score(&self, user_id: Uuid) -> Result<()> {
        let now = Utc::now();
        let mut score = self
            .trust
            .trust_score(user_id)
            .await?
            .unwrap_or_else(|| CreatorTrustScore::new(user_id));

        // Posting-velocity heuristic over the trailing hour.
        let recent_posts = self
            .catalog
            .posts_in_window(user_id, now - Duration::hours(1))
            .await?;
        if recent_posts > VELOCITY_POST_LIMIT {
            score.spam_signals = (score.spam_signals + VELOCITY_SPAM_BUMP).min(1.0);
            debug!(%user_id, recent_posts, "Posting-velocity spam signal");
        }

        // Quality factors from the creator's most recent post metrics.
        let recent = self
            .metrics
            .recent_metrics_for_creator(user_id, RECENT_METRICS_WINDOW)
            .await?;
        if !recent.is_empty() {
            let avg_completion = mean(&recent, |m| m.completion_rate);
            let avg_likes = mean(&recent, |m| m.like_rate);
            let avg_skips = mean(&recent, |m| m.skip_rate);

            score.content_quality = avg_completion;

            // High like rate over content nobody finishes reads as bought
            // or botted engagement.
            if avg_likes > 0.3 && avg_completion < 0.3 {
                score.engagement_quality = 0.5;
                score.spam_signals = (score.spam_signals + BOT_PATTERN_SPAM_BUMP).min(1.0);
                debug!(%user_id, avg_likes, avg_completion, "Bot-like engagement pattern");
            } else {
                score.engagement_quality = (avg_completion + 0.2).min(1.0);
            }

            if avg_skips > 0.5 {
                score.content_quality *= 0.7;
            }
        }

        // Reports over the trailing 30 days.
        let reports = self
            .catalog
            .report_count(user_id, now - Duration::days(30))
            .await?;
        score.report_weight =
            (reports as f64 * self.config.report_weight_per_report).min(1.0);

        score.trust_score = compute_trust(&score);
        score.is_shadow_banned = score.trust_score < self.config.ban_threshold;

        if score.is_shadow_banned {
            score.shadow_ban_reason = Some(ban_reason(&score));
            score.shadow_ban_expires_at = Some(now + Duration::days(self.config.ban_days));
            warn!(
                %user_id,
                trust = score.trust_score,
                reason = score.shadow_ban_reason.as_deref().unwrap_or(""),
                "Creator shadow-banned"
            );
        } else {
            score.shadow_ban_reason = None;
            score.shadow_ban_expires_at = None;
        }
        score.updated_at = now;

        self.trust.upsert_trust_score(score).await
    }

    /// Current shadow-ban state, lifting expired bans lazily on read.
    pub async fn is_creator_shadow_banned(&self, user_id: Uuid) -> Result<bool> {
        let Some(mut score) = self.trust.trust_score(user_id).await? else {
            return Ok(false);
        };
        if !score.is_shadow_banned {
            return Ok(false);
        }

        if let Some(expires_at) = score.shadow_ban_expires_at {
            if Utc::now() > expires_at {
                score.is_shadow_banned = false;
                score.shadow_ban_reason = None;
                score.shadow_ban_expires_at = None;
                score.updated_at = Utc::now();
                info!(%user_id, "Shadow ban expired; lifting");
                self.trust.upsert_trust_score(score).await?;
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Daily job: decay accumulated spam signals and refresh trust scores
    /// from the decayed value, leaving other factors untouched until the
    /// next full update.
    pub async fn decay_spam_signals(&self) -> Result<DecayOutcome> {
        let scores = self.trust.all_trust_scores().await?;
        let mut processed = 0usize;

        for mut score in scores {
            if score.spam_signals <= 0.0 {
                continue;
            }
            score.spam_signals *= SPAM_DECAY;
            score.trust_score = compute_trust(&score);
            score.updated_at = Utc::now();

            let user_id = score.user_id;
            match self.trust.upsert_trust_score(score).await {
                Ok(()) => processed += 1,
                Err(e) => warn!(error = %e, %user_id, "Spam decay failed for creator"),
            }
        }

        info!(processed, "Spam-signal decay cycle complete");
        Ok(DecayOutcome { processed })
    }

    /// Daily job: eagerly lift every ban past its expiry.
    pub async fn check_expired_shadow_bans(&self) -> Result<ExpirySweepOutcome> {
        let now = Utc::now();
        let scores = self.trust.all_trust_scores().await?;
        let mut expired = 0usize;

        for mut score in scores {
            let past_expiry = score.is_shadow_banned
                && score
                    .shadow_ban_expires_at
                    .map_or(false, |expires| expires <= now);
            if !past_expiry {
                continue;
            }

            score.is_shadow_banned = false;
            score.shadow_ban_reason = None;
            score.shadow_ban_expires_at = None;
            score.updated_at = now;

            let user_id = score.user_id;
            match self.trust.upsert_trust_score(score).await {
                Ok(()) => {
                    expired += 1;
                    info!(%user_id, "Lifted expired shadow ban");
                }
                Err(e) => warn!(error = %e, %user_id, "Failed to lift expired ban"),
            }
        }

        Ok(ExpirySweepOutcome { expired })
    }

    /// A report against a post recomputes the owning creator's trust.
    pub async fn handle_post_report(&self, post_id: Uuid, reporter_id: Uuid) -> Result<()> {
        let Some(author_id) = self.catalog.post_author(post_id).await? else {
            debug!(%post_id, "Report against unknown post; ignoring");
            return Ok(());
        };
        debug!(%post_id, %author_id, %reporter_id, "Post reported");
        self.update_creator_trust_score(author_id).await
    }
}

/// The trust formula: quality factors averaged, penalties subtracted.
fn compute_trust(score: &CreatorTrustScore) -> f64 {
    let base =
        (score.originality_score + score.engagement_quality + score.content_quality) / 3.0;
    (base - score.spam_signals - score.report_weight).clamp(0.0, 1.0)
}

/// Human-readable explanation built from the thresholds that tripped.
fn ban_reason(score: &CreatorTrustScore) -> String {
    let mut reasons = Vec::new();
    if score.spam_signals > 0.3 {
        reasons.push("excessive spam signals");
    }
    if score.report_weight > 0.3 {
        reasons.push("high report volume");
    }
    if score.content_quality < 0.3 {
        reasons.push("low content quality");
    }
    if score.engagement_quality < 0.5 {
        reasons.push("low engagement quality");
    }
    if reasons.is_empty() {
        reasons.push("low overall trust score");
    }
    reasons.join(", ")
}

fn mean(rows: &[PostMetrics], f: impl Fn(&PostMetrics) -> f64) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(&f).sum::<f64>() / rows.len() as f64
}
