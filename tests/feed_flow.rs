//! End-to-end flow through the public API: tagging, watch ingestion,
//! metrics recompute, trust scoring, and feed generation wired over the
//! in-memory store with the inline dispatcher for deterministic analytics.

use chrono::{Duration, Utc};
use feed_ranking::config::{FeedConfig, RankingConfig, TrustConfig};
use feed_ranking::services::ranking::FeedOptions;
use feed_ranking::store::{MetricsStore, TrustStore};
use feed_ranking::{
    BatchWatchEvent, ContentTagger, DistributionPhase, FeedType, InlineDispatcher,
    InterestProfiler, MemoryStore, MetricsAggregator, RankingEngine, TrustScorer,
    WatchEventInput, WatchTracker,
};
use once_cell::sync::Lazy;
use std::sync::Arc;
use uuid::Uuid;

static INIT_TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
});

struct Stack {
    store: Arc<MemoryStore>,
    tagger: ContentTagger,
    tracker: WatchTracker,
    engine: RankingEngine,
    trust: Arc<TrustScorer>,
}

fn build_stack() -> Stack {
    Lazy::force(&INIT_TRACING);

    let store = Arc::new(MemoryStore::new());
    let profiler = Arc::new(InterestProfiler::new(store.clone(), store.clone()));
    let aggregator = Arc::new(MetricsAggregator::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let trust = Arc::new(TrustScorer::new(
        store.clone(),
        store.clone(),
        store.clone(),
        TrustConfig::default(),
    ));
    let tagger = ContentTagger::new(store.clone());
    let tracker = WatchTracker::new(
        store.clone(),
        profiler.clone(),
        aggregator.clone(),
        Arc::new(InlineDispatcher),
    );
    let engine = RankingEngine::new(
        profiler,
        trust.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        FeedConfig::default(),
        RankingConfig::default(),
    )
    .with_seed(7);

    Stack {
        store,
        tagger,
        tracker,
        engine,
        trust,
    }
}

fn full_watch() -> WatchEventInput {
    WatchEventInput {
        watch_duration_secs: 10.0,
        total_duration_secs: 10.0,
        ..Default::default()
    }
}

#[tokio::test]
async fn watch_events_flow_into_profile_and_feed_ordering() {
    let stack = build_stack();
    let viewer = Uuid::new_v4();
    let creator = Uuid::new_v4();
    let now = Utc::now();

    // Two posts in distinct categories.
    let gaming_post = Uuid::new_v4();
    let cooking_post = Uuid::new_v4();
    stack.store.add_post(gaming_post, creator, now, true, false);
    stack.store.add_post(cooking_post, creator, now, true, false);
    stack
        .tagger
        .auto_tag(gaming_post, "insane #gaming speedrun gameplay", &[])
        .await;
    stack
        .tagger
        .auto_tag(cooking_post, "easy #recipe with five ingredients", &[])
        .await;

    // The viewer repeatedly finishes gaming content and bails on cooking.
    for _ in 0..20 {
        stack
            .tracker
            .record_watch_event(gaming_post, Some(viewer), full_watch())
            .await
            .unwrap();
        stack
            .tracker
            .record_watch_event(
                cooking_post,
                Some(viewer),
                WatchEventInput {
                    watch_duration_secs: 1.0,
                    total_duration_secs: 10.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let page = stack
        .engine
        .generate_personalized_feed(Some(viewer), FeedOptions::default())
        .await
        .unwrap();

    assert_eq!(page.posts.len(), 2);
    assert_eq!(page.posts[0].post_id, gaming_post);
    assert!(page.posts[0].score > page.posts[1].score);
}

#[tokio::test]
async fn metrics_and_phase_emerge_from_raw_events() {
    let stack = build_stack();
    let creator = Uuid::new_v4();
    let post = Uuid::new_v4();
    stack.store.add_post(post, creator, Utc::now(), true, false);

    // 150 strong watches: TEST -> SCALE on recompute.
    for _ in 0..150 {
        stack
            .tracker
            .record_watch_event(post, Some(Uuid::new_v4()), full_watch())
            .await
            .unwrap();
    }

    let metrics = MetricsStore::metrics(stack.store.as_ref(), post)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(metrics.total_views, 150);
    assert_eq!(metrics.distribution_phase, DistributionPhase::Scale);
    assert!((metrics.completion_rate - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn batch_ingest_reports_outcome_and_updates_metrics() {
    let stack = build_stack();
    let creator = Uuid::new_v4();
    let post = Uuid::new_v4();
    stack.store.add_post(post, creator, Utc::now(), true, false);

    let events: Vec<BatchWatchEvent> = (0..10)
        .map(|_| BatchWatchEvent {
            post_id: post,
            user_id: Some(Uuid::new_v4()),
            input: full_watch(),
        })
        .collect();

    let outcome = stack.tracker.record_watch_events_batch(events).await;
    assert_eq!(outcome.processed, 10);
    assert_eq!(outcome.failed, 0);

    let metrics = MetricsStore::metrics(stack.store.as_ref(), post)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(metrics.total_views, 10);
    assert_eq!(metrics.unique_views, 10);
}

#[tokio::test]
async fn reported_creator_ends_up_suppressed_in_feed() {
    let stack = build_stack();
    let viewer = Uuid::new_v4();
    let reported = Uuid::new_v4();
    let clean = Uuid::new_v4();
    let now = Utc::now();

    let reported_post = Uuid::new_v4();
    let clean_post = Uuid::new_v4();
    stack.store.add_post(reported_post, reported, now, true, false);
    stack.store.add_post(clean_post, clean, now, true, false);

    // Terrible watch behavior on the reported creator's post.
    for _ in 0..10 {
        stack
            .tracker
            .record_watch_event(
                reported_post,
                Some(Uuid::new_v4()),
                WatchEventInput {
                    watch_duration_secs: 0.5,
                    total_duration_secs: 10.0,
                    skipped: true,
                    skip_time_secs: Some(0.5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }
    // Healthy engagement on the clean creator's post.
    for _ in 0..10 {
        stack
            .tracker
            .record_watch_event(clean_post, Some(Uuid::new_v4()), full_watch())
            .await
            .unwrap();
    }
    // A pile of reports pushes trust under the ban threshold.
    for _ in 0..15 {
        stack.store.add_report(reported, now - Duration::days(1));
    }
    stack
        .trust
        .handle_post_report(reported_post, Uuid::new_v4())
        .await
        .unwrap();

    assert!(stack
        .trust
        .is_creator_shadow_banned(reported)
        .await
        .unwrap());
    let row = TrustStore::trust_score(stack.store.as_ref(), reported)
        .await
        .unwrap()
        .unwrap();
    assert!(row.shadow_ban_reason.is_some());

    let page = stack
        .engine
        .generate_personalized_feed(Some(viewer), FeedOptions::default())
        .await
        .unwrap();
    assert_eq!(page.posts[0].author_id, clean);
}

#[tokio::test]
async fn preference_feedback_invalidates_cache_immediately() {
    let stack = build_stack();
    let viewer = Uuid::new_v4();
    let creator = Uuid::new_v4();
    let now = Utc::now();

    let keep = Uuid::new_v4();
    let dismissed = Uuid::new_v4();
    stack.store.add_post(keep, creator, now, true, false);
    stack.store.add_post(dismissed, creator, now, true, false);

    // Prime the cache.
    let first = stack
        .engine
        .generate_personalized_feed(Some(viewer), FeedOptions::default())
        .await
        .unwrap();
    assert_eq!(first.posts.len(), 2);

    // Marking not-interested must bypass the cached row on the next read.
    stack.engine.mark_not_interested(viewer, dismissed).await.unwrap();
    let second = stack
        .engine
        .generate_personalized_feed(Some(viewer), FeedOptions::default())
        .await
        .unwrap();
    assert_eq!(second.posts.len(), 1);
    assert_eq!(second.posts[0].post_id, keep);
}

#[tokio::test]
async fn explore_and_following_feeds_share_the_single_cache_row() {
    let stack = build_stack();
    let viewer = Uuid::new_v4();
    let followed = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let now = Utc::now();

    stack.store.add_follow(viewer, followed);
    stack.store.add_post(Uuid::new_v4(), followed, now, true, false);
    stack.store.add_post(Uuid::new_v4(), stranger, now, true, false);

    let explore = stack
        .engine
        .generate_personalized_feed(
            Some(viewer),
            FeedOptions {
                feed_type: FeedType::Explore,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(explore.posts.len(), 2);

    // A following request cannot be served from the explore row.
    let following = stack
        .engine
        .generate_personalized_feed(
            Some(viewer),
            FeedOptions {
                feed_type: FeedType::Following,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(following.posts.len(), 1);
    assert_eq!(following.posts[0].author_id, followed);
}

#[tokio::test]
async fn anonymous_watches_still_drive_metrics() {
    let stack = build_stack();
    let creator = Uuid::new_v4();
    let post = Uuid::new_v4();
    stack.store.add_post(post, creator, Utc::now(), true, false);

    for _ in 0..5 {
        stack
            .tracker
            .record_watch_event(post, None, full_watch())
            .await
            .unwrap();
    }

    let metrics = MetricsStore::metrics(stack.store.as_ref(), post)
        .await
        .unwrap()
        .unwrap();
    // Anonymous volume stands in for unique reach by contract.
    assert_eq!(metrics.unique_views, 5);
}
