//! Content-ranking and creator-trust core.
//!
//! Personalized feed generation over interest profiles, per-post
//! engagement metrics with a staged distribution rollout, and creator
//! trust scoring with time-boxed shadow bans. Persistence and social
//! collaborators plug in through the trait seams in [`store`].

pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;
pub mod store;
pub mod tasks;

pub use config::Config;
pub use error::{AppError, Result};

pub use models::{
    CachedFeed, CategoryVector, ContentCategory, CreatorTrustScore, DistributionPhase,
    EngagementCounts, FeedEntry, FeedType, PostContentVector, PostMetrics, PreferenceKind,
    UserContentPreference, UserInterestProfile, WatchEvent, WatchSource,
};
pub use services::{
    BatchOutcome, BatchWatchEvent, ContentTagger, FeedOptions, FeedPage, InterestProfiler,
    MetricsAggregator, RankingEngine, TrustScorer, WatchEventInput, WatchTracker,
};
pub use store::MemoryStore;
pub use tasks::{InlineDispatcher, SpawnDispatcher, TaskDispatcher};
