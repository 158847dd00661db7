//! Entity types for the ranking and creator-trust core.

pub mod categories;

pub use categories::{CategoryVector, ContentCategory, CATEGORY_COUNT, NEUTRAL_INTEREST};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Per-post category tag vector derived from hashtags and content keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostContentVector {
    pub post_id: Uuid,
    pub tags: CategoryVector,
    pub hashtags: HashSet<String>,
    pub updated_at: DateTime<Utc>,
}

/// Where a watch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchSource {
    Feed,
    Profile,
    Search,
    Direct,
}

impl Default for WatchSource {
    fn default() -> Self {
        WatchSource::Feed
    }
}

/// Raw watch event, the source-of-truth row every metric is recomputed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEvent {
    pub id: Uuid,
    pub post_id: Uuid,
    /// None for anonymous viewers.
    pub user_id: Option<Uuid>,
    pub watch_duration_secs: f64,
    pub total_duration_secs: f64,
    /// Capped at 1.0 even when replays push the duration ratio past it.
    pub completion_rate: f64,
    pub replay_count: u32,
    pub skipped_in_first_2s: bool,
    pub source: WatchSource,
    pub created_at: DateTime<Utc>,
}

/// Staged rollout position of a post.
///
/// Transitions only move forward (Test -> Scale -> Blast, Test -> Killed);
/// Blast and Killed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistributionPhase {
    Test,
    Scale,
    Blast,
    Killed,
}

impl DistributionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, DistributionPhase::Blast | DistributionPhase::Killed)
    }
}

/// Aggregated engagement metrics for one post over the trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMetrics {
    pub post_id: Uuid,
    pub total_views: u64,
    pub unique_views: u64,
    pub avg_watch_time_secs: f64,
    pub completion_rate: f64,
    pub replay_rate: f64,
    pub like_rate: f64,
    pub comment_rate: f64,
    pub share_rate: f64,
    pub save_rate: f64,
    pub skip_rate: f64,
    pub viral_score: f64,
    pub distribution_phase: DistributionPhase,
    pub last_calculated_at: DateTime<Utc>,
}

/// Per-creator trust factors and shadow-ban state.
///
/// Created at full trust; only observed signals degrade it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatorTrustScore {
    pub user_id: Uuid,
    pub originality_score: f64,
    pub engagement_quality: f64,
    /// Accumulator, clamped to [0,1].
    pub spam_signals: f64,
    /// Accumulator, clamped to [0,1].
    pub report_weight: f64,
    pub content_quality: f64,
    pub trust_score: f64,
    pub is_shadow_banned: bool,
    pub shadow_ban_reason: Option<String>,
    pub shadow_ban_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl CreatorTrustScore {
    /// Fresh row with maximal trust.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            originality_score: 1.0,
            engagement_quality: 1.0,
            spam_signals: 0.0,
            report_weight: 0.0,
            content_quality: 1.0,
            trust_score: 1.0,
            is_shadow_banned: false,
            shadow_ban_reason: None,
            shadow_ban_expires_at: None,
            updated_at: Utc::now(),
        }
    }
}

/// Per-user interest profile, lazily created at neutral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInterestProfile {
    pub user_id: Uuid,
    pub interests: CategoryVector,
    pub updated_at: DateTime<Utc>,
}

impl UserInterestProfile {
    pub fn neutral(user_id: Uuid) -> Self {
        Self {
            user_id,
            interests: CategoryVector::neutral(),
            updated_at: Utc::now(),
        }
    }
}

/// Which feed a request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedType {
    ForYou,
    Following,
    Explore,
}

impl Default for FeedType {
    fn default() -> Self {
        FeedType::ForYou
    }
}

impl FeedType {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedType::ForYou => "for_you",
            FeedType::Following => "following",
            FeedType::Explore => "explore",
        }
    }
}

/// One ranked entry in a generated feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// A user's last computed ranked feed. One row per user; a row past
/// `expires_at` is treated as a miss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedFeed {
    pub user_id: Uuid,
    pub entries: Vec<FeedEntry>,
    pub feed_type: FeedType,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Explicit negative feedback on feed content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreferenceKind {
    NotInterested { post_id: Uuid },
    HideCreator { creator_id: Uuid },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContentPreference {
    pub user_id: Uuid,
    pub kind: PreferenceKind,
    pub created_at: DateTime<Utc>,
}

/// Candidate post surfaced by the catalog collaborator.
#[derive(Debug, Clone)]
pub struct CandidatePost {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Engagement counters fetched from the social collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngagementCounts {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub saves: u64,
}
