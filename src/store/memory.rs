//! In-memory store backing tests and embedded deployments.
//!
//! Every trait in the store module is implemented over dashmap shards.
//! Writes are full-row upserts, matching the concurrency contract: two
//! concurrent recomputations of the same row interleave safely and the
//! last write wins.

use super::{
    CandidateFilter, EngagementCounters, FeedCacheStore, MetricsStore, PostCatalog,
    PreferenceStore, ProfileStore, SocialGraph, TagStore, TrustStore, WatchStore,
};
use crate::error::Result;
use crate::models::{
    CachedFeed, CandidatePost, CreatorTrustScore, EngagementCounts, PostContentVector,
    PostMetrics, PreferenceKind, UserContentPreference, UserInterestProfile, WatchEvent,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::RwLock;
use uuid::Uuid;

/// Catalog row for a post. Visibility drives candidate filtering: inactive
/// posts are never candidates, private authors only for their followers.
#[derive(Debug, Clone)]
pub struct CatalogPost {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub author_is_private: bool,
}

#[derive(Debug, Clone)]
struct ReportRow {
    reported_user_id: Uuid,
    created_at: DateTime<Utc>,
}

/// Dashmap-backed implementation of every store and collaborator trait.
#[derive(Default)]
pub struct MemoryStore {
    content_vectors: DashMap<Uuid, PostContentVector>,
    profiles: DashMap<Uuid, UserInterestProfile>,
    watch_events: DashMap<Uuid, WatchEvent>,
    metrics: DashMap<Uuid, PostMetrics>,
    trust_scores: DashMap<Uuid, CreatorTrustScore>,
    feed_cache: DashMap<Uuid, CachedFeed>,
    preferences: DashMap<Uuid, Vec<UserContentPreference>>,
    posts: DashMap<Uuid, CatalogPost>,
    follows: DashMap<Uuid, HashSet<Uuid>>,
    blocks: DashMap<Uuid, HashSet<Uuid>>,
    engagement: DashMap<Uuid, EngagementCounts>,
    reports: RwLock<Vec<ReportRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a post in the catalog.
    pub fn add_post(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        created_at: DateTime<Utc>,
        is_active: bool,
        author_is_private: bool,
    ) {
        self.posts.insert(
            post_id,
            CatalogPost {
                post_id,
                author_id,
                created_at,
                is_active,
                author_is_private,
            },
        );
    }

    /// Record that `follower` follows `followee`.
    pub fn add_follow(&self, follower: Uuid, followee: Uuid) {
        self.follows.entry(follower).or_default().insert(followee);
    }

    /// Record that `blocker` blocked `blocked`.
    pub fn add_block(&self, blocker: Uuid, blocked: Uuid) {
        self.blocks.entry(blocker).or_default().insert(blocked);
    }

    pub fn set_engagement(&self, post_id: Uuid, counts: EngagementCounts) {
        self.engagement.insert(post_id, counts);
    }

    /// File a report against a creator.
    pub fn add_report(&self, reported_user_id: Uuid, created_at: DateTime<Utc>) {
        self.reports
            .write()
            .expect("reports lock poisoned")
            .push(ReportRow {
                reported_user_id,
                created_at,
            });
    }

    /// Force a user's cached feed past its expiry (test/maintenance hook).
    pub fn expire_cached_feed(&self, user_id: Uuid) {
        if let Some(mut row) = self.feed_cache.get_mut(&user_id) {
            row.expires_at = Utc::now() - Duration::seconds(1);
        }
    }

    /// Direct trust-row mutation for test setup.
    pub fn set_trust_score(&self, score: CreatorTrustScore) {
        self.trust_scores.insert(score.user_id, score);
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn upsert_content_vector(&self, vector: PostContentVector) -> Result<()> {
        self.content_vectors.insert(vector.post_id, vector);
        Ok(())
    }

    async fn content_vector(&self, post_id: Uuid) -> Result<Option<PostContentVector>> {
        Ok(self.content_vectors.get(&post_id).map(|v| v.clone()))
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn profile(&self, user_id: Uuid) -> Result<Option<UserInterestProfile>> {
        Ok(self.profiles.get(&user_id).map(|p| p.clone()))
    }

    async fn upsert_profile(&self, profile: UserInterestProfile) -> Result<()> {
        self.profiles.insert(profile.user_id, profile);
        Ok(())
    }

    async fn all_profiles(&self) -> Result<Vec<UserInterestProfile>> {
        Ok(self.profiles.iter().map(|p| p.clone()).collect())
    }
}

#[async_trait]
impl WatchStore for MemoryStore {
    async fn insert_event(&self, event: WatchEvent) -> Result<()> {
        self.watch_events.insert(event.id, event);
        Ok(())
    }

    async fn insert_events(&self, events: Vec<WatchEvent>) -> Result<usize> {
        let written = events.len();
        for event in events {
            self.watch_events.insert(event.id, event);
        }
        Ok(written)
    }

    async fn events_for_post(
        &self,
        post_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<WatchEvent>> {
        let mut events: Vec<WatchEvent> = self
            .watch_events
            .iter()
            .filter(|e| e.post_id == post_id && e.created_at >= since)
            .map(|e| e.clone())
            .collect();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }
}

#[async_trait]
impl MetricsStore for MemoryStore {
    async fn metrics(&self, post_id: Uuid) -> Result<Option<PostMetrics>> {
        Ok(self.metrics.get(&post_id).map(|m| m.clone()))
    }

    async fn upsert_metrics(&self, metrics: PostMetrics) -> Result<()> {
        self.metrics.insert(metrics.post_id, metrics);
        Ok(())
    }

    async fn recent_metrics_for_creator(
        &self,
        creator_id: Uuid,
        limit: usize,
    ) -> Result<Vec<PostMetrics>> {
        // Join against the catalog to find the creator's posts, newest first.
        let mut posts: Vec<CatalogPost> = self
            .posts
            .iter()
            .filter(|p| p.author_id == creator_id)
            .map(|p| p.clone())
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let rows = posts
            .into_iter()
            .filter_map(|p| self.metrics.get(&p.post_id).map(|m| m.clone()))
            .take(limit)
            .collect();
        Ok(rows)
    }
}

#[async_trait]
impl TrustStore for MemoryStore {
    async fn trust_score(&self, user_id: Uuid) -> Result<Option<CreatorTrustScore>> {
        Ok(self.trust_scores.get(&user_id).map(|s| s.clone()))
    }

    async fn upsert_trust_score(&self, score: CreatorTrustScore) -> Result<()> {
        self.trust_scores.insert(score.user_id, score);
        Ok(())
    }

    async fn all_trust_scores(&self) -> Result<Vec<CreatorTrustScore>> {
        Ok(self.trust_scores.iter().map(|s| s.clone()).collect())
    }
}

#[async_trait]
impl FeedCacheStore for MemoryStore {
    async fn cached_feed(&self, user_id: Uuid) -> Result<Option<CachedFeed>> {
        Ok(self.feed_cache.get(&user_id).map(|f| f.clone()))
    }

    async fn put_feed(&self, feed: CachedFeed) -> Result<()> {
        self.feed_cache.insert(feed.user_id, feed);
        Ok(())
    }

    async fn delete_feed(&self, user_id: Uuid) -> Result<()> {
        self.feed_cache.remove(&user_id);
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn upsert_preference(&self, preference: UserContentPreference) -> Result<()> {
        let mut rows = self.preferences.entry(preference.user_id).or_default();
        // (user, post) unique for not-interested, (user, creator) for hides.
        let duplicate = rows.iter().any(|existing| match (&existing.kind, &preference.kind) {
            (
                PreferenceKind::NotInterested { post_id: a },
                PreferenceKind::NotInterested { post_id: b },
            ) => a == b,
            (
                PreferenceKind::HideCreator { creator_id: a },
                PreferenceKind::HideCreator { creator_id: b },
            ) => a == b,
            _ => false,
        });
        if !duplicate {
            rows.push(preference);
        }
        Ok(())
    }

    async fn preferences(&self, user_id: Uuid) -> Result<Vec<UserContentPreference>> {
        Ok(self
            .preferences
            .get(&user_id)
            .map(|rows| rows.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl PostCatalog for MemoryStore {
    async fn recent_candidates(
        &self,
        filter: CandidateFilter,
        limit: usize,
    ) -> Result<Vec<CandidatePost>> {
        let mut posts: Vec<CatalogPost> = self
            .posts
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| !filter.exclude_post_ids.contains(&p.post_id))
            .filter(|p| !filter.exclude_author_ids.contains(&p.author_id))
            .filter(|p| {
                filter
                    .restrict_to_authors
                    .as_ref()
                    .map_or(true, |authors| authors.contains(&p.author_id))
            })
            .filter(|p| !p.author_is_private || filter.viewer_follows.contains(&p.author_id))
            .map(|p| p.clone())
            .collect();

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(limit);

        Ok(posts
            .into_iter()
            .map(|p| CandidatePost {
                post_id: p.post_id,
                author_id: p.author_id,
                created_at: p.created_at,
            })
            .collect())
    }

    async fn post_author(&self, post_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self.posts.get(&post_id).map(|p| p.author_id))
    }

    async fn posts_in_window(&self, creator_id: Uuid, since: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .posts
            .iter()
            .filter(|p| p.author_id == creator_id && p.created_at >= since)
            .count() as u64)
    }

    async fn report_count(&self, creator_id: Uuid, since: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .reports
            .read()
            .expect("reports lock poisoned")
            .iter()
            .filter(|r| r.reported_user_id == creator_id && r.created_at >= since)
            .count() as u64)
    }
}

#[async_trait]
impl SocialGraph for MemoryStore {
    async fn following_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        Ok(self
            .follows
            .get(&user_id)
            .map(|s| s.clone())
            .unwrap_or_default())
    }

    async fn blocked_user_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let mut blocked: HashSet<Uuid> = self
            .blocks
            .get(&user_id)
            .map(|s| s.clone())
            .unwrap_or_default();
        // Blocks cut both ways: users who blocked the viewer are hidden too.
        for entry in self.blocks.iter() {
            if entry.value().contains(&user_id) {
                blocked.insert(*entry.key());
            }
        }
        Ok(blocked)
    }
}

#[async_trait]
impl EngagementCounters for MemoryStore {
    async fn counts(&self, post_id: Uuid) -> Result<EngagementCounts> {
        Ok(self
            .engagement
            .get(&post_id)
            .map(|c| *c)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryVector;

    #[tokio::test]
    async fn test_blocked_user_ids_bidirectional() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let carol = Uuid::new_v4();

        store.add_block(alice, bob);
        store.add_block(carol, alice);

        let blocked = store.blocked_user_ids(alice).await.unwrap();
        assert!(blocked.contains(&bob));
        assert!(blocked.contains(&carol));
        assert_eq!(blocked.len(), 2);
    }

    #[tokio::test]
    async fn test_preference_upsert_is_unique_per_post() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let post = Uuid::new_v4();

        for _ in 0..3 {
            store
                .upsert_preference(UserContentPreference {
                    user_id: user,
                    kind: PreferenceKind::NotInterested { post_id: post },
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.preferences(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recent_candidates_respects_privacy() {
        let store = MemoryStore::new();
        let private_author = Uuid::new_v4();
        let public_author = Uuid::new_v4();
        let private_post = Uuid::new_v4();
        let public_post = Uuid::new_v4();

        store.add_post(private_post, private_author, Utc::now(), true, true);
        store.add_post(public_post, public_author, Utc::now(), true, false);

        // Not following the private author: only the public post is visible.
        let candidates = store
            .recent_candidates(CandidateFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].post_id, public_post);

        // Following the private author opens up their posts.
        let filter = CandidateFilter {
            viewer_follows: [private_author].into_iter().collect(),
            ..Default::default()
        };
        let candidates = store.recent_candidates(filter, 10).await.unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_events_for_post_window() {
        let store = MemoryStore::new();
        let post = Uuid::new_v4();
        let now = Utc::now();

        for days_ago in [1, 3, 10] {
            store
                .insert_event(WatchEvent {
                    id: Uuid::new_v4(),
                    post_id: post,
                    user_id: None,
                    watch_duration_secs: 5.0,
                    total_duration_secs: 10.0,
                    completion_rate: 0.5,
                    replay_count: 0,
                    skipped_in_first_2s: false,
                    source: Default::default(),
                    created_at: now - Duration::days(days_ago),
                })
                .await
                .unwrap();
        }

        let events = store
            .events_for_post(post, now - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_content_vector_overwritten_on_retag() {
        let store = MemoryStore::new();
        let post = Uuid::new_v4();

        let mut tags = CategoryVector::zeros();
        tags.set(crate::models::ContentCategory::Music, 0.3);
        store
            .upsert_content_vector(PostContentVector {
                post_id: post,
                tags,
                hashtags: ["#music".to_string()].into_iter().collect(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let mut retagged = CategoryVector::zeros();
        retagged.set(crate::models::ContentCategory::Dance, 0.6);
        store
            .upsert_content_vector(PostContentVector {
                post_id: post,
                tags: retagged,
                hashtags: ["#dance".to_string()].into_iter().collect(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let stored = store.content_vector(post).await.unwrap().unwrap();
        assert_eq!(stored.tags.get(crate::models::ContentCategory::Music), 0.0);
        assert_eq!(stored.tags.get(crate::models::ContentCategory::Dance), 0.6);
    }
}
