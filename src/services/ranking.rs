//! Personalized feed generation
//!
//! Orchestrates candidate retrieval, interest/viral scoring, phase
//! weighting, the per-user TTL feed cache, and cursor pagination. Feed
//! generation is read-mostly: two concurrent cache misses for the same
//! user may both score and both write the cache row, which is accepted
//! rather than serialized behind a lock.

use crate::config::{FeedConfig, RankingConfig};
use crate::error::Result;
use crate::models::{
    CachedFeed, CandidatePost, CategoryVector, FeedEntry, FeedType, PreferenceKind,
    UserContentPreference,
};
use crate::services::interest::InterestProfiler;
use crate::services::trust::TrustScorer;
use crate::store::{
    CandidateFilter, FeedCacheStore, MetricsStore, PostCatalog, PreferenceStore, SocialGraph,
    TagStore,
};
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

const SECS_PER_DAY: f64 = 86_400.0;

// Phase weighting multipliers (not applied to the following feed).
const PHASE_WEIGHT_KILLED: f64 = 0.3;
const PHASE_WEIGHT_BLAST: f64 = 1.5;
const PHASE_WEIGHT_SCALE: f64 = 1.2;

// Reason tags surfaced alongside scores.
const REASON_INTEREST_MATCH: &str = "interest_match";
const REASON_FOLLOWING: &str = "following";
const REASON_VIRAL: &str = "viral";
const REASON_FRESH: &str = "fresh";

/// Feed request options.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub limit: usize,
    /// Last-seen post id; an unknown id silently restarts from the top.
    pub cursor: Option<String>,
    pub exclude_post_ids: Vec<Uuid>,
    pub feed_type: FeedType,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            cursor: None,
            exclude_post_ids: Vec::new(),
            feed_type: FeedType::ForYou,
        }
    }
}

/// One page of a generated feed.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<FeedEntry>,
    pub next_cursor: Option<String>,
}

pub struct RankingEngine {
    profiler: Arc<InterestProfiler>,
    trust: Arc<TrustScorer>,
    tags: Arc<dyn TagStore>,
    metrics: Arc<dyn MetricsStore>,
    catalog: Arc<dyn PostCatalog>,
    social: Arc<dyn SocialGraph>,
    cache: Arc<dyn FeedCacheStore>,
    preferences: Arc<dyn PreferenceStore>,
    feed_config: FeedConfig,
    ranking_config: RankingConfig,
    /// Exploration jitter RNG. Seedable so tests are reproducible;
    /// production construction seeds from entropy.
    rng: Mutex<StdRng>,
}

impl RankingEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profiler: Arc<InterestProfiler>,
        trust: Arc<TrustScorer>,
        tags: Arc<dyn TagStore>,
        metrics: Arc<dyn MetricsStore>,
        catalog: Arc<dyn PostCatalog>,
        social: Arc<dyn SocialGraph>,
        cache: Arc<dyn FeedCacheStore>,
        preferences: Arc<dyn PreferenceStore>,
        feed_config: FeedConfig,
        ranking_config: RankingConfig,
    ) -> Self {
        Self {
            profiler,
            trust,
            tags,
            metrics,
            catalog,
            social,
            cache,
            preferences,
            feed_config,
            ranking_config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Fix the jitter seed (tests).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Generate (or serve from cache) a ranked feed page.
    pub async fn generate_personalized_feed(
        &self,
        user_id: Option<Uuid>,
        options: FeedOptions,
    ) -> Result<FeedPage> {
        let limit = if options.limit == 0 {
            self.feed_config.default_page_size
        } else {
            options.limit.min(self.feed_config.max_page_size)
        };

        // Cache check: one row per user, matching feed type, unexpired.
        if let Some(user_id) = user_id {
            if let Some(cached) = self.cache.cached_feed(user_id).await? {
                if cached.feed_type == options.feed_type && Utc::now() <= cached.expires_at {
                    debug!(%user_id, feed_type = options.feed_type.as_str(), "Feed cache hit");
                    return Ok(paginate(&cached.entries, options.cursor.as_deref(), limit));
                }
            }
        }

        let entries = self.rank_candidates(user_id, &options).await?;

        // Persist the full ranked list for subsequent pages.
        if let Some(user_id) = user_id {
            let now = Utc::now();
            self.cache
                .put_feed(CachedFeed {
                    user_id,
                    entries: entries.clone(),
                    feed_type: options.feed_type,
                    generated_at: now,
                    expires_at: now
                        + Duration::seconds(self.feed_config.cache_ttl_secs as i64),
                })
                .await?;
        }

        info!(
            ?user_id,
            feed_type = options.feed_type.as_str(),
            ranked = entries.len(),
            "Generated feed"
        );

        Ok(paginate(&entries, options.cursor.as_deref(), limit))
    }

    /// Score and order the candidate pool for one request.
    async fn rank_candidates(
        &self,
        user_id: Option<Uuid>,
        options: &FeedOptions,
    ) -> Result<Vec<FeedEntry>> {
        // Personalization context. Anonymous viewers rank against the
        // neutral vector with no social signals.
        let (interests, following, blocked, prefs) = match user_id {
            Some(user_id) => (
                self.profiler.user_interests(user_id).await?,
                self.social.following_ids(user_id).await?,
                self.social.blocked_user_ids(user_id).await?,
                self.preferences.preferences(user_id).await?,
            ),
            None => (
                CategoryVector::neutral(),
                HashSet::new(),
                HashSet::new(),
                Vec::new(),
            ),
        };

        let (not_interested, hidden_creators) = split_preferences(&prefs);

        let mut exclude_post_ids: HashSet<Uuid> = not_interested;
        exclude_post_ids.extend(options.exclude_post_ids.iter().copied());

        let mut exclude_author_ids = blocked;
        exclude_author_ids.extend(hidden_creators);

        let filter = CandidateFilter {
            exclude_post_ids,
            exclude_author_ids,
            restrict_to_authors: (options.feed_type == FeedType::Following)
                .then(|| following.clone()),
            viewer_follows: following.clone(),
        };

        let candidates = self
            .catalog
            .recent_candidates(filter, self.feed_config.candidate_limit)
            .await?;

        debug!(candidate_count = candidates.len(), "Scoring feed candidates");

        // Shadow-ban lookups once per distinct author.
        let authors: HashSet<Uuid> = candidates.iter().map(|c| c.author_id).collect();
        let mut banned_authors: HashMap<Uuid, bool> = HashMap::with_capacity(authors.len());
        for author in authors {
            banned_authors.insert(author, self.trust.is_creator_shadow_banned(author).await?);
        }

        let now = Utc::now();
        let mut entries = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let entry = self
                .score_candidate(&candidate, &interests, &following, &banned_authors, now)
                .await?;
            entries.push(entry);
        }

        sort_by_score(&mut entries);

        // Phase weighting pass; the following feed shows everything a
        // followed creator posts, so it skips the rollout gating.
        if options.feed_type != FeedType::Following {
            self.apply_phase_weights(&mut entries).await?;
            sort_by_score(&mut entries);
        }

        Ok(entries)
    }

    async fn score_candidate(
        &self,
        candidate: &CandidatePost,
        interests: &CategoryVector,
        following: &HashSet<Uuid>,
        banned_authors: &HashMap<Uuid, bool>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<FeedEntry> {
        let cfg = &self.ranking_config;
        let mut reasons = Vec::new();

        // Interest match: zero for untagged posts.
        let interest = match self.tags.content_vector(candidate.post_id).await? {
            Some(content) => InterestProfiler::interest_match(interests, &content.tags),
            None => 0.0,
        };
        if interest > 0.3 {
            reasons.push(REASON_INTEREST_MATCH.to_string());
        }

        let viral = self
            .metrics
            .metrics(candidate.post_id)
            .await?
            .map(|m| m.viral_score)
            .unwrap_or(0.0);
        if viral >= 0.5 {
            reasons.push(REASON_VIRAL.to_string());
        }

        let mut score = interest * cfg.interest_weight + viral * cfg.viral_weight;

        if following.contains(&candidate.author_id) {
            score *= cfg.follow_boost;
            reasons.push(REASON_FOLLOWING.to_string());
        }

        let age_days =
            (now - candidate.created_at).num_seconds().max(0) as f64 / SECS_PER_DAY;
        score *= cfg.freshness_decay.powf(age_days);
        if age_days < 1.0 {
            reasons.push(REASON_FRESH.to_string());
        }

        if banned_authors
            .get(&candidate.author_id)
            .copied()
            .unwrap_or(false)
        {
            score *= cfg.shadow_ban_factor;
        }

        // Exploration jitter keeps the feed from calcifying.
        let jitter = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            1.0 + (rng.gen::<f64>() - 0.5) * (cfg.jitter * 2.0)
        };
        score *= jitter;

        Ok(FeedEntry {
            post_id: candidate.post_id,
            author_id: candidate.author_id,
            created_at: candidate.created_at,
            score,
            reasons,
        })
    }

    async fn apply_phase_weights(&self, entries: &mut [FeedEntry]) -> Result<()> {
        use crate::models::DistributionPhase::*;
        for entry in entries.iter_mut() {
            let Some(metrics) = self.metrics.metrics(entry.post_id).await? else {
                continue;
            };
            entry.score *= match metrics.distribution_phase {
                Killed => PHASE_WEIGHT_KILLED,
                Blast => PHASE_WEIGHT_BLAST,
                Scale => PHASE_WEIGHT_SCALE,
                Test => 1.0,
            };
        }
        Ok(())
    }

    /// Record not-interested feedback and invalidate the cached feed.
    pub async fn mark_not_interested(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        self.preferences
            .upsert_preference(UserContentPreference {
                user_id,
                kind: PreferenceKind::NotInterested { post_id },
                created_at: Utc::now(),
            })
            .await?;
        debug!(%user_id, %post_id, "Marked not interested");
        self.cache.delete_feed(user_id).await
    }

    /// Hide a creator from a user's feeds and invalidate the cached feed.
    pub async fn hide_creator(&self, user_id: Uuid, creator_id: Uuid) -> Result<()> {
        self.preferences
            .upsert_preference(UserContentPreference {
                user_id,
                kind: PreferenceKind::HideCreator { creator_id },
                created_at: Utc::now(),
            })
            .await?;
        debug!(%user_id, %creator_id, "Hid creator");
        self.cache.delete_feed(user_id).await
    }

    /// Drop a user's cached feed; absence is not an error.
    pub async fn invalidate_feed_cache(&self, user_id: Uuid) -> Result<()> {
        self.cache.delete_feed(user_id).await
    }
}

fn split_preferences(prefs: &[UserContentPreference]) -> (HashSet<Uuid>, HashSet<Uuid>) {
    let mut not_interested = HashSet::new();
    let mut hidden = HashSet::new();
    for pref in prefs {
        match pref.kind {
            PreferenceKind::NotInterested { post_id } => {
                not_interested.insert(post_id);
            }
            PreferenceKind::HideCreator { creator_id } => {
                hidden.insert(creator_id);
            }
        }
    }
    (not_interested, hidden)
}

fn sort_by_score(entries: &mut [FeedEntry]) {
    entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}

/// Cursor pagination over a ranked list. The cursor is the last-seen post
/// id; an unknown or absent cursor starts at the top.
fn paginate(entries: &[FeedEntry], cursor: Option<&str>, limit: usize) -> FeedPage {
    let start = cursor
        .and_then(|c| Uuid::parse_str(c).ok())
        .and_then(|last_seen| entries.iter().position(|e| e.post_id == last_seen))
        .map(|idx| idx + 1)
        .unwrap_or(0);

    let end = (start + limit).min(entries.len());
    let posts: Vec<FeedEntry> = entries[start..end].to_vec();

    let next_cursor = if end < entries.len() {
        posts.last().map(|e| e.post_id.to_string())
    } else {
        None
    };

    FeedPage { posts, next_cursor }
}
