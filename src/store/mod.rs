//! Persistence and collaborator seams.
//!
//! The ranking core never talks to a database or another service directly;
//! it goes through these traits. The in-memory implementation in
//! [`memory`] backs tests and embedded use, and a SQL/Redis/gRPC-backed
//! implementation can be swapped in without touching the services.

pub mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{
    CachedFeed, CandidatePost, CreatorTrustScore, EngagementCounts, PostContentVector,
    PostMetrics, UserContentPreference, UserInterestProfile, WatchEvent,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

/// Post tag vectors.
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn upsert_content_vector(&self, vector: PostContentVector) -> Result<()>;
    async fn content_vector(&self, post_id: Uuid) -> Result<Option<PostContentVector>>;
}

/// User interest profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile(&self, user_id: Uuid) -> Result<Option<UserInterestProfile>>;
    async fn upsert_profile(&self, profile: UserInterestProfile) -> Result<()>;
    async fn all_profiles(&self) -> Result<Vec<UserInterestProfile>>;
}

/// Raw watch events (append-only).
#[async_trait]
pub trait WatchStore: Send + Sync {
    async fn insert_event(&self, event: WatchEvent) -> Result<()>;

    /// Bulk insert. Returns the number of rows actually written; a partial
    /// write reports the written prefix length rather than failing the call.
    async fn insert_events(&self, events: Vec<WatchEvent>) -> Result<usize>;

    async fn events_for_post(
        &self,
        post_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<WatchEvent>>;
}

/// Aggregated per-post metrics.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn metrics(&self, post_id: Uuid) -> Result<Option<PostMetrics>>;
    async fn upsert_metrics(&self, metrics: PostMetrics) -> Result<()>;

    /// Most recent metric rows for a creator's posts, newest first.
    async fn recent_metrics_for_creator(
        &self,
        creator_id: Uuid,
        limit: usize,
    ) -> Result<Vec<PostMetrics>>;
}

/// Creator trust scores.
#[async_trait]
pub trait TrustStore: Send + Sync {
    async fn trust_score(&self, user_id: Uuid) -> Result<Option<CreatorTrustScore>>;
    async fn upsert_trust_score(&self, score: CreatorTrustScore) -> Result<()>;
    async fn all_trust_scores(&self) -> Result<Vec<CreatorTrustScore>>;
}

/// One cached feed row per user.
#[async_trait]
pub trait FeedCacheStore: Send + Sync {
    async fn cached_feed(&self, user_id: Uuid) -> Result<Option<CachedFeed>>;
    async fn put_feed(&self, feed: CachedFeed) -> Result<()>;

    /// Deleting a row that does not exist is not an error.
    async fn delete_feed(&self, user_id: Uuid) -> Result<()>;
}

/// Explicit content preferences (not-interested / hidden creators).
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Upsert keyed on (user, post) for not-interested and (user, creator)
    /// for hidden creators.
    async fn upsert_preference(&self, preference: UserContentPreference) -> Result<()>;
    async fn preferences(&self, user_id: Uuid) -> Result<Vec<UserContentPreference>>;
}

/// Filter applied when retrieving feed candidates.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub exclude_post_ids: HashSet<Uuid>,
    pub exclude_author_ids: HashSet<Uuid>,
    /// When set, only posts from these authors are returned (following feed).
    pub restrict_to_authors: Option<HashSet<Uuid>>,
    /// Authors the viewer follows; private authors are visible only here.
    pub viewer_follows: HashSet<Uuid>,
}

/// Post catalog collaborator: candidate retrieval plus the filtered
/// counts the trust scorer needs.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PostCatalog: Send + Sync {
    /// Most-recent active posts passing the filter, newest first.
    async fn recent_candidates(
        &self,
        filter: CandidateFilter,
        limit: usize,
    ) -> Result<Vec<CandidatePost>>;

    async fn post_author(&self, post_id: Uuid) -> Result<Option<Uuid>>;

    /// Posts published by a creator since `since` (posting-velocity signal).
    async fn posts_in_window(&self, creator_id: Uuid, since: DateTime<Utc>) -> Result<u64>;

    /// Combined post + user reports filed against a creator since `since`.
    async fn report_count(&self, creator_id: Uuid, since: DateTime<Utc>) -> Result<u64>;
}

/// Social graph collaborator.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SocialGraph: Send + Sync {
    async fn following_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>>;

    /// Blocks in either direction.
    async fn blocked_user_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>>;
}

/// Engagement counter collaborator (likes/comments/shares/saves per post).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EngagementCounters: Send + Sync {
    async fn counts(&self, post_id: Uuid) -> Result<EngagementCounts>;
}
