//! Per-user interest profiling
//!
//! Profiles move toward the categories of watched posts in proportion to
//! how strongly the watch signalled interest, and a daily decay pulls
//! every category back toward neutral so stale affinities fade.

use crate::error::Result;
use crate::models::{CategoryVector, UserInterestProfile, NEUTRAL_INTEREST};
use crate::store::{ProfileStore, TagStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Scales how far a single watch moves the profile.
const LEARNING_RATE: f64 = 0.1;

/// Daily multiplicative retention toward neutral. Each decay run pulls 5%
/// of the distance to 0.5; the once-per-day cadence is part of the
/// contract, since running it more often shortens the effective half-life.
const DECAY_RATE: f64 = 0.95;

/// Maps watch behavior to a scalar interest signal.
///
/// Replays are the strongest positive signal; an early bail-out is the
/// only negative one.
fn signal_strength(completion_rate: f64, replayed: bool) -> f64 {
    if replayed {
        0.3
    } else if completion_rate >= 0.9 {
        0.2
    } else if completion_rate >= 0.7 {
        0.1
    } else if completion_rate >= 0.3 {
        0.0
    } else {
        -0.1
    }
}

/// Maintains per-user interest vectors.
pub struct InterestProfiler {
    profiles: Arc<dyn ProfileStore>,
    tags: Arc<dyn TagStore>,
}

impl InterestProfiler {
    pub fn new(profiles: Arc<dyn ProfileStore>, tags: Arc<dyn TagStore>) -> Self {
        Self { profiles, tags }
    }

    /// Nudge a user's profile from one watch of one post.
    ///
    /// No-op when the post has no content vector. The profile is lazily
    /// created at neutral on first touch.
    pub async fn update_user_interests(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        completion_rate: f64,
        replayed: bool,
    ) -> Result<()> {
        let Some(content) = self.tags.content_vector(post_id).await? else {
            debug!(%post_id, "No content vector; skipping interest update");
            return Ok(());
        };

        let mut profile = self
            .profiles
            .profile(user_id)
            .await?
            .unwrap_or_else(|| UserInterestProfile::neutral(user_id));

        let strength = signal_strength(completion_rate, replayed);

        for (category, tag_weight) in content.tags.iter() {
            if tag_weight == 0.0 {
                continue;
            }
            let delta = strength * tag_weight * LEARNING_RATE;
            profile.interests.add_clamped(category, delta);
        }
        profile.updated_at = Utc::now();

        debug!(
            %user_id,
            %post_id,
            signal = strength,
            "Updated interest profile"
        );

        self.profiles.upsert_profile(profile).await
    }

    /// Stored interest vector, or the neutral default for unknown users.
    pub async fn user_interests(&self, user_id: Uuid) -> Result<CategoryVector> {
        Ok(self
            .profiles
            .profile(user_id)
            .await?
            .map(|p| p.interests)
            .unwrap_or_else(CategoryVector::neutral))
    }

    /// Cosine similarity between a user vector and a post tag vector.
    pub fn interest_match(user_interests: &CategoryVector, post_tags: &CategoryVector) -> f64 {
        user_interests.cosine_similarity(post_tags)
    }

    /// Daily decay job: pull every stored profile toward neutral.
    ///
    /// Per-profile failures are logged and do not abort the batch.
    pub async fn apply_interest_decay(&self) -> Result<()> {
        let profiles = self.profiles.all_profiles().await?;
        let total = profiles.len();
        let mut failed = 0usize;

        for mut profile in profiles {
            for (category, value) in profile.interests.clone().iter() {
                let decayed = value + (NEUTRAL_INTEREST - value) * (1.0 - DECAY_RATE);
                profile.interests.set(category, decayed.clamp(0.0, 1.0));
            }
            profile.updated_at = Utc::now();

            let user_id = profile.user_id;
            if let Err(e) = self.profiles.upsert_profile(profile).await {
                failed += 1;
                warn!(error = %e, %user_id, "Interest decay failed for profile");
            }
        }

        info!(total, failed, "Interest decay cycle complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentCategory;
    use crate::models::PostContentVector;
    use crate::store::MemoryStore;
    use crate::store::{ProfileStore as _, TagStore as _};
    use std::collections::HashSet;

    async fn store_with_tagged_post(post_id: Uuid, category: ContentCategory, weight: f64) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let mut tags = CategoryVector::zeros();
        tags.set(category, weight);
        store
            .upsert_content_vector(PostContentVector {
                post_id,
                tags,
                hashtags: HashSet::new(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_signal_strength_table() {
        assert_eq!(signal_strength(0.5, true), 0.3);
        assert_eq!(signal_strength(0.95, false), 0.2);
        assert_eq!(signal_strength(0.75, false), 0.1);
        assert_eq!(signal_strength(0.5, false), 0.0);
        assert_eq!(signal_strength(0.1, false), -0.1);
    }

    #[tokio::test]
    async fn test_update_moves_profile_toward_watched_category() {
        let post_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let store = store_with_tagged_post(post_id, ContentCategory::Gaming, 1.0).await;
        let profiler = InterestProfiler::new(store.clone(), store.clone());

        profiler
            .update_user_interests(user_id, post_id, 0.95, false)
            .await
            .unwrap();

        let interests = profiler.user_interests(user_id).await.unwrap();
        // 0.5 + 0.2 * 1.0 * 0.1 = 0.52
        assert!((interests.get(ContentCategory::Gaming) - 0.52).abs() < 1e-9);
        // Untouched categories stay neutral.
        assert_eq!(interests.get(ContentCategory::Food), NEUTRAL_INTEREST);
    }

    #[tokio::test]
    async fn test_low_completion_pushes_category_down() {
        let post_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let store = store_with_tagged_post(post_id, ContentCategory::News, 1.0).await;
        let profiler = InterestProfiler::new(store.clone(), store.clone());

        profiler
            .update_user_interests(user_id, post_id, 0.1, false)
            .await
            .unwrap();

        let interests = profiler.user_interests(user_id).await.unwrap();
        assert!(interests.get(ContentCategory::News) < NEUTRAL_INTEREST);
    }

    #[tokio::test]
    async fn test_missing_content_vector_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let profiler = InterestProfiler::new(store.clone(), store.clone());
        let user_id = Uuid::new_v4();

        profiler
            .update_user_interests(user_id, Uuid::new_v4(), 1.0, true)
            .await
            .unwrap();

        // No profile row should have been created.
        assert!(store.profile(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_values_stay_in_bounds_after_many_updates() {
        let post_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let store = store_with_tagged_post(post_id, ContentCategory::Music, 1.0).await;
        let profiler = InterestProfiler::new(store.clone(), store.clone());

        for _ in 0..100 {
            profiler
                .update_user_interests(user_id, post_id, 1.0, true)
                .await
                .unwrap();
        }
        let interests = profiler.user_interests(user_id).await.unwrap();
        assert_eq!(interests.get(ContentCategory::Music), 1.0);
        assert!(interests.is_normalized());

        for _ in 0..200 {
            profiler
                .update_user_interests(user_id, post_id, 0.05, false)
                .await
                .unwrap();
        }
        let interests = profiler.user_interests(user_id).await.unwrap();
        assert_eq!(interests.get(ContentCategory::Music), 0.0);
        assert!(interests.is_normalized());
    }

    #[tokio::test]
    async fn test_decay_pulls_toward_neutral_from_both_sides() {
        let store = Arc::new(MemoryStore::new());
        let profiler = InterestProfiler::new(store.clone(), store.clone());
        let user_id = Uuid::new_v4();

        let mut profile = UserInterestProfile::neutral(user_id);
        profile.interests.set(ContentCategory::Dance, 1.0);
        profile.interests.set(ContentCategory::News, 0.0);
        store.upsert_profile(profile).await.unwrap();

        profiler.apply_interest_decay().await.unwrap();

        let interests = profiler.user_interests(user_id).await.unwrap();
        // 1.0 + (0.5 - 1.0) * 0.05 = 0.975
        assert!((interests.get(ContentCategory::Dance) - 0.975).abs() < 1e-9);
        // 0.0 + (0.5 - 0.0) * 0.05 = 0.025
        assert!((interests.get(ContentCategory::News) - 0.025).abs() < 1e-9);
        // Neutral values are a fixed point.
        assert_eq!(interests.get(ContentCategory::Food), NEUTRAL_INTEREST);
    }

    #[tokio::test]
    async fn test_repeated_decay_stays_in_bounds() {
        let store = Arc::new(MemoryStore::new());
        let profiler = InterestProfiler::new(store.clone(), store.clone());
        let user_id = Uuid::new_v4();

        let mut profile = UserInterestProfile::neutral(user_id);
        profile.interests.set(ContentCategory::Art, 1.0);
        store.upsert_profile(profile).await.unwrap();

        for _ in 0..500 {
            profiler.apply_interest_decay().await.unwrap();
        }

        let interests = profiler.user_interests(user_id).await.unwrap();
        assert!(interests.is_normalized());
        // Converges to neutral.
        assert!((interests.get(ContentCategory::Art) - NEUTRAL_INTEREST).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_unknown_user_gets_neutral_vector() {
        let store = Arc::new(MemoryStore::new());
        let profiler = InterestProfiler::new(store.clone(), store.clone());

        let interests = profiler.user_interests(Uuid::new_v4()).await.unwrap();
        assert_eq!(interests, CategoryVector::neutral());
    }
}
