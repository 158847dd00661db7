pub mod interest;
pub mod metrics;
pub mod ranking;
pub mod tagger;
pub mod trust;
pub mod watch;

pub use interest::InterestProfiler;
pub use metrics::MetricsAggregator;
pub use ranking::{FeedOptions, FeedPage, RankingEngine};
pub use tagger::ContentTagger;
pub use trust::{DecayOutcome, ExpirySweepOutcome, TrustScorer};
pub use watch::{BatchOutcome, BatchWatchEvent, WatchEventInput, WatchTracker};
