use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    pub ranking: RankingConfig,
    pub trust: TrustConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Cached feed TTL in seconds (10 minutes).
    pub cache_ttl_secs: u64,
    /// Candidate pool size per feed generation.
    pub candidate_limit: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 600,
            candidate_limit: 500,
            default_page_size: 10,
            max_page_size: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Weight of the interest-match component.
    pub interest_weight: f64,
    /// Weight of the viral-score component.
    pub viral_weight: f64,
    /// Multiplier for posts from followed creators.
    pub follow_boost: f64,
    /// Per-day multiplicative freshness decay.
    pub freshness_decay: f64,
    /// Multiplier applied to shadow-banned creators' posts.
    pub shadow_ban_factor: f64,
    /// Half-width of the exploration jitter (0.05 => +/-5%).
    pub jitter: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            interest_weight: 0.7,
            viral_weight: 0.2,
            follow_boost: 1.5,
            freshness_decay: 0.95,
            shadow_ban_factor: 0.1,
            jitter: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Trust score below which a creator is shadow-banned.
    pub ban_threshold: f64,
    /// Shadow-ban duration in days.
    pub ban_days: i64,
    /// Report weight contributed per report in the trailing 30 days.
    pub report_weight_per_report: f64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            ban_threshold: 0.3,
            ban_days: 7,
            report_weight_per_report: 0.05,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            ranking: RankingConfig::default(),
            trust: TrustConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = Config::default();
        Ok(Config {
            feed: FeedConfig {
                cache_ttl_secs: env_or("FEED_CACHE_TTL_SECS", defaults.feed.cache_ttl_secs)?,
                candidate_limit: env_or("FEED_CANDIDATE_LIMIT", defaults.feed.candidate_limit)?,
                default_page_size: env_or(
                    "FEED_DEFAULT_PAGE_SIZE",
                    defaults.feed.default_page_size,
                )?,
                max_page_size: env_or("FEED_MAX_PAGE_SIZE", defaults.feed.max_page_size)?,
            },
            ranking: RankingConfig {
                interest_weight: env_or("RANKING_INTEREST_WEIGHT", defaults.ranking.interest_weight)?,
                viral_weight: env_or("RANKING_VIRAL_WEIGHT", defaults.ranking.viral_weight)?,
                follow_boost: env_or("RANKING_FOLLOW_BOOST", defaults.ranking.follow_boost)?,
                freshness_decay: env_or("RANKING_FRESHNESS_DECAY", defaults.ranking.freshness_decay)?,
                shadow_ban_factor: env_or(
                    "RANKING_SHADOW_BAN_FACTOR",
                    defaults.ranking.shadow_ban_factor,
                )?,
                jitter: env_or("RANKING_JITTER", defaults.ranking.jitter)?,
            },
            trust: TrustConfig {
                ban_threshold: env_or("TRUST_BAN_THRESHOLD", defaults.trust.ban_threshold)?,
                ban_days: env_or("TRUST_BAN_DAYS", defaults.trust.ban_days)?,
                report_weight_per_report: env_or(
                    "TRUST_REPORT_WEIGHT",
                    defaults.trust.report_weight_per_report,
                )?,
            },
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T::Err: std::error::Error + 'static,
{
    match std::env::var(key) {
        Ok(raw) => Ok(raw.parse()?),
        Err(_) => Ok(default),
    }
}
