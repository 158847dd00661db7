//! Content tagging
//!
//! Derives a per-post category tag vector from hashtags and content
//! keywords. Tagging is best-effort: a failure here only means a post
//! carries no tags and scores zero interest match, so errors are logged
//! and swallowed instead of failing the publish path.

use crate::models::{CategoryVector, ContentCategory, PostContentVector};
use crate::store::TagStore;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Relevance added per hashtag-dictionary match.
const HASHTAG_MATCH_WEIGHT: f64 = 0.3;
/// Relevance added per keyword-dictionary match.
const KEYWORD_MATCH_WEIGHT: f64 = 0.2;

static HASHTAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\w+").expect("hashtag pattern is valid"));

/// Hashtag -> categories dictionary. Keys are stored without the leading '#'.
static HASHTAG_CATEGORIES: Lazy<HashMap<&'static str, &'static [ContentCategory]>> =
    Lazy::new(|| {
        use ContentCategory::*;
        let mut map: HashMap<&'static str, &'static [ContentCategory]> = HashMap::new();
        map.insert("funny", &[Comedy, Entertainment] as &[_]);
        map.insert("comedy", &[Comedy, Entertainment]);
        map.insert("meme", &[Comedy]);
        map.insert("dance", &[Dance, Entertainment]);
        map.insert("dancing", &[Dance]);
        map.insert("music", &[Music, Entertainment]);
        map.insert("song", &[Music]);
        map.insert("cover", &[Music]);
        map.insert("sports", &[Sports]);
        map.insert("football", &[Sports]);
        map.insert("basketball", &[Sports]);
        map.insert("gaming", &[Gaming, Entertainment]);
        map.insert("gamer", &[Gaming]);
        map.insert("foodie", &[Food, Lifestyle]);
        map.insert("recipe", &[Food, Diy]);
        map.insert("cooking", &[Food]);
        map.insert("travel", &[Travel, Lifestyle]);
        map.insert("wanderlust", &[Travel]);
        map.insert("ootd", &[Fashion, Lifestyle]);
        map.insert("fashion", &[Fashion]);
        map.insert("makeup", &[Beauty]);
        map.insert("skincare", &[Beauty, Lifestyle]);
        map.insert("workout", &[Fitness]);
        map.insert("gym", &[Fitness, Lifestyle]);
        map.insert("fitness", &[Fitness]);
        map.insert("learn", &[Education]);
        map.insert("tutorial", &[Education, Diy]);
        map.insert("tech", &[Technology]);
        map.insert("coding", &[Technology, Education]);
        map.insert("ai", &[Technology]);
        map.insert("art", &[Art]);
        map.insert("drawing", &[Art]);
        map.insert("dog", &[Pets]);
        map.insert("cat", &[Pets]);
        map.insert("pets", &[Pets]);
        map.insert("nature", &[Nature]);
        map.insert("hiking", &[Nature, Travel]);
        map.insert("diy", &[Diy]);
        map.insert("craft", &[Diy, Art]);
        map.insert("lifestyle", &[Lifestyle]);
        map.insert("vlog", &[Lifestyle, Entertainment]);
        map.insert("news", &[News]);
        map.insert("breaking", &[News]);
        map
    });

/// Keyword -> categories dictionary scanned over lowercased content.
static KEYWORD_CATEGORIES: Lazy<HashMap<&'static str, &'static [ContentCategory]>> =
    Lazy::new(|| {
        use ContentCategory::*;
        let mut map: HashMap<&'static str, &'static [ContentCategory]> = HashMap::new();
        map.insert("hilarious", &[Comedy] as &[_]);
        map.insert("laugh", &[Comedy]);
        map.insert("choreography", &[Dance]);
        map.insert("remix", &[Music]);
        map.insert("playlist", &[Music]);
        map.insert("match", &[Sports]);
        map.insert("goal", &[Sports]);
        map.insert("gameplay", &[Gaming]);
        map.insert("speedrun", &[Gaming]);
        map.insert("delicious", &[Food]);
        map.insert("ingredients", &[Food]);
        map.insert("itinerary", &[Travel]);
        map.insert("outfit", &[Fashion]);
        map.insert("foundation", &[Beauty]);
        map.insert("reps", &[Fitness]);
        map.insert("protein", &[Fitness, Food]);
        map.insert("explained", &[Education]);
        map.insert("how to", &[Education, Diy]);
        map.insert("algorithm", &[Technology]);
        map.insert("gadget", &[Technology]);
        map.insert("sketch", &[Art]);
        map.insert("puppy", &[Pets]);
        map.insert("kitten", &[Pets]);
        map.insert("sunset", &[Nature]);
        map.insert("wildlife", &[Nature]);
        map.insert("handmade", &[Diy]);
        map.insert("routine", &[Lifestyle]);
        map.insert("headline", &[News]);
        map
    });

/// Derives and persists a post's category tag vector.
pub struct ContentTagger {
    tags: Arc<dyn TagStore>,
}

impl ContentTagger {
    pub fn new(tags: Arc<dyn TagStore>) -> Self {
        Self { tags }
    }

    /// Tag a post from its content and any explicitly supplied hashtags.
    ///
    /// Non-fatal by contract: persistence failures are logged and
    /// swallowed, leaving the post untagged.
    pub async fn auto_tag(&self, post_id: Uuid, content: &str, hashtags: &[String]) {
        let vector = build_content_vector(post_id, content, hashtags);

        debug!(
            %post_id,
            hashtag_count = vector.hashtags.len(),
            top_relevance = vector.tags.max_score(),
            "Auto-tagged post"
        );

        if let Err(e) = self.tags.upsert_content_vector(vector).await {
            warn!(error = %e, %post_id, "Failed to persist content tags");
        }
    }
}

/// Pure tagging step: hashtag extraction, dictionary matching, capping.
fn build_content_vector(post_id: Uuid, content: &str, hashtags: &[String]) -> PostContentVector {
    let content_lower = content.to_lowercase();

    // Hashtags from the content body, unioned with explicit ones.
    let mut all_hashtags: HashSet<String> = HASHTAG_PATTERN
        .find_iter(&content_lower)
        .map(|m| m.as_str().to_string())
        .collect();
    for tag in hashtags {
        let tag = tag.to_lowercase();
        if tag.starts_with('#') {
            all_hashtags.insert(tag);
        } else {
            all_hashtags.insert(format!("#{}", tag));
        }
    }

    let mut tags = CategoryVector::zeros();

    for hashtag in &all_hashtags {
        if let Some(categories) = HASHTAG_CATEGORIES.get(hashtag.trim_start_matches('#')) {
            for category in categories.iter() {
                tags.add_clamped(*category, HASHTAG_MATCH_WEIGHT);
            }
        }
    }

    for (keyword, categories) in KEYWORD_CATEGORIES.iter() {
        if content_lower.contains(keyword) {
            for category in categories.iter() {
                tags.add_clamped(*category, KEYWORD_MATCH_WEIGHT);
            }
        }
    }

    // Nothing matched: fall back to the catch-all category so the post
    // still participates in interest matching.
    if tags.max_score() == 0.0 {
        tags.set(ContentCategory::Other, 1.0);
    }

    PostContentVector {
        post_id,
        tags,
        hashtags: all_hashtags,
        updated_at: Utc::now(),
    }
}
