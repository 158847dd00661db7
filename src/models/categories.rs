//! Closed content-category set and fixed-width category vectors
//!
//! Every interest profile and post tag vector is defined over the same
//! closed set of categories, so vector operations are bounds-checked by
//! construction and cosine similarity never has to reconcile key sets.

use serde::{Deserialize, Serialize};

/// Number of content categories. The set is closed; extending it is a
/// schema migration, not a runtime operation.
pub const CATEGORY_COUNT: usize = 20;

/// Neutral affinity for a category the user has shown no signal on.
pub const NEUTRAL_INTEREST: f64 = 0.5;

/// Closed set of content categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Comedy,
    Dance,
    Music,
    Sports,
    Gaming,
    Food,
    Travel,
    Fashion,
    Beauty,
    Fitness,
    Education,
    Technology,
    Art,
    Pets,
    Nature,
    Diy,
    Lifestyle,
    News,
    Entertainment,
    Other,
}

impl ContentCategory {
    /// Canonical iteration order. Index into a [`CategoryVector`] is the
    /// position in this array.
    pub const ALL: [ContentCategory; CATEGORY_COUNT] = [
        ContentCategory::Comedy,
        ContentCategory::Dance,
        ContentCategory::Music,
        ContentCategory::Sports,
        ContentCategory::Gaming,
        ContentCategory::Food,
        ContentCategory::Travel,
        ContentCategory::Fashion,
        ContentCategory::Beauty,
        ContentCategory::Fitness,
        ContentCategory::Education,
        ContentCategory::Technology,
        ContentCategory::Art,
        ContentCategory::Pets,
        ContentCategory::Nature,
        ContentCategory::Diy,
        ContentCategory::Lifestyle,
        ContentCategory::News,
        ContentCategory::Entertainment,
        ContentCategory::Other,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|c| *c == self).unwrap_or(0)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentCategory::Comedy => "comedy",
            ContentCategory::Dance => "dance",
            ContentCategory::Music => "music",
            ContentCategory::Sports => "sports",
            ContentCategory::Gaming => "gaming",
            ContentCategory::Food => "food",
            ContentCategory::Travel => "travel",
            ContentCategory::Fashion => "fashion",
            ContentCategory::Beauty => "beauty",
            ContentCategory::Fitness => "fitness",
            ContentCategory::Education => "education",
            ContentCategory::Technology => "technology",
            ContentCategory::Art => "art",
            ContentCategory::Pets => "pets",
            ContentCategory::Nature => "nature",
            ContentCategory::Diy => "diy",
            ContentCategory::Lifestyle => "lifestyle",
            ContentCategory::News => "news",
            ContentCategory::Entertainment => "entertainment",
            ContentCategory::Other => "other",
        }
    }
}

/// Dense score vector over the closed category set.
///
/// Used both for user interest profiles (values in [0,1], neutral 0.5) and
/// for post tag relevance (values in [0,1], default 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryVector {
    scores: [f64; CATEGORY_COUNT],
}

impl CategoryVector {
    /// All-zero vector (untagged post).
    pub fn zeros() -> Self {
        Self {
            scores: [0.0; CATEGORY_COUNT],
        }
    }

    /// Uniform vector with every category at `value`.
    pub fn splat(value: f64) -> Self {
        Self {
            scores: [value; CATEGORY_COUNT],
        }
    }

    /// Neutral interest vector (every category at 0.5).
    pub fn neutral() -> Self {
        Self::splat(NEUTRAL_INTEREST)
    }

    pub fn get(&self, category: ContentCategory) -> f64 {
        self.scores[category.index()]
    }

    pub fn set(&mut self, category: ContentCategory, value: f64) {
        self.scores[category.index()] = value;
    }

    /// Add `delta` to one category, clamping the result to [0,1].
    pub fn add_clamped(&mut self, category: ContentCategory, delta: f64) {
        let idx = category.index();
        self.scores[idx] = (self.scores[idx] + delta).clamp(0.0, 1.0);
    }

    /// Iterate `(category, score)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (ContentCategory, f64)> + '_ {
        ContentCategory::ALL
            .iter()
            .map(move |c| (*c, self.scores[c.index()]))
    }

    /// Largest component value.
    pub fn max_score(&self) -> f64 {
        self.scores.iter().copied().fold(0.0_f64, f64::max)
    }

    /// True if every component is within [0,1].
    pub fn is_normalized(&self) -> bool {
        self.scores.iter().all(|v| (0.0..=1.0).contains(v))
    }

    /// Cosine similarity over the full category set.
    ///
    /// Returns 0.0 when either vector has zero magnitude, so untagged posts
    /// and empty profiles contribute nothing rather than dividing by zero.
    pub fn cosine_similarity(&self, other: &CategoryVector) -> f64 {
        let mut dot = 0.0;
        let mut mag_a = 0.0;
        let mut mag_b = 0.0;

        for i in 0..CATEGORY_COUNT {
            dot += self.scores[i] * other.scores[i];
            mag_a += self.scores[i] * self.scores[i];
            mag_b += other.scores[i] * other.scores[i];
        }

        if mag_a == 0.0 || mag_b == 0.0 {
            return 0.0;
        }

        dot / (mag_a.sqrt() * mag_b.sqrt())
    }
}

impl Default for CategoryVector {
    fn default() -> Self {
        Self::zeros()
    }
}
