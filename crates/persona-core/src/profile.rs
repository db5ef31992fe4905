use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Share of items in each sentiment bucket. The three fractions sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
    /// Mean lexicon polarity across scored items, in `[-1, 1]`.
    pub mean_polarity: f64,
}

impl SentimentDistribution {
    /// Even split used when there is nothing to score.
    #[must_use]
    pub fn uniform() -> Self {
        Self {
            positive: 1.0 / 3.0,
            neutral: 1.0 / 3.0,
            negative: 1.0 / 3.0,
            mean_polarity: 0.0,
        }
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.positive + self.neutral + self.negative
    }
}

/// A label with a relative weight (a share in `[0, 1]`) or raw hit count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedLabel {
    pub label: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPattern {
    NightOwl,
    EarlyBird,
    Balanced,
}

impl std::fmt::Display for DayPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DayPattern::NightOwl => write!(f, "night_owl"),
            DayPattern::EarlyBird => write!(f, "early_bird"),
            DayPattern::Balanced => write!(f, "balanced"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityCadence {
    pub items_per_day: f64,
    pub active_days: usize,
    /// Item counts per UTC hour of day.
    pub active_hours: [u32; 24],
    pub peak_hour: Option<u8>,
    pub pattern: DayPattern,
}

impl Default for ActivityCadence {
    fn default() -> Self {
        Self {
            items_per_day: 0.0,
            active_days: 0,
            active_hours: [0; 24],
            peak_hour: None,
            pattern: DayPattern::Balanced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritingStyle {
    pub avg_words_per_item: f64,
    pub avg_words_per_sentence: f64,
    /// `simple`, `moderate`, or `complex`.
    pub complexity: String,
    /// `enthusiastic`, `inquisitive`, or `neutral`.
    pub tone: String,
}

impl Default for WritingStyle {
    fn default() -> Self {
        Self {
            avg_words_per_item: 0.0,
            avg_words_per_sentence: 0.0,
            complexity: "simple".to_string(),
            tone: "neutral".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementLevel {
    Low,
    Moderate,
    High,
}

impl std::fmt::Display for EngagementLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngagementLevel::Low => write!(f, "low"),
            EngagementLevel::Moderate => write!(f, "moderate"),
            EngagementLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub average_score: f64,
    pub total_score: i64,
    /// Comments as a share of all items.
    pub comment_ratio: f64,
    pub level: EngagementLevel,
}

impl Default for Engagement {
    fn default() -> Self {
        Self {
            average_score: 0.0,
            total_score: 0,
            comment_ratio: 0.0,
            level: EngagementLevel::Low,
        }
    }
}

/// Behavioral features derived from a user's activity. Recomputed per
/// request and never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProfile {
    pub item_count: usize,
    pub post_count: usize,
    pub comment_count: usize,
    /// Set when there was no activity to analyze.
    pub insufficient_data: bool,
    pub sentiment: SentimentDistribution,
    pub interest_tags: BTreeSet<String>,
    /// Interest categories by keyword hits, most frequent first.
    pub interest_weights: Vec<WeightedLabel>,
    /// Communities by share of items, most active first. Weights sum to 1.0.
    pub community_affinity: Vec<WeightedLabel>,
    pub cadence: ActivityCadence,
    pub writing_style: WritingStyle,
    pub engagement: Engagement,
    /// Four-letter type estimated from indicator words, e.g. `INTP`.
    pub mbti_hint: String,
}

impl FeatureProfile {
    /// The profile of an empty activity set.
    #[must_use]
    pub fn insufficient() -> Self {
        Self {
            item_count: 0,
            post_count: 0,
            comment_count: 0,
            insufficient_data: true,
            sentiment: SentimentDistribution::uniform(),
            interest_tags: BTreeSet::new(),
            interest_weights: Vec::new(),
            community_affinity: Vec::new(),
            cadence: ActivityCadence::default(),
            writing_style: WritingStyle::default(),
            engagement: Engagement::default(),
            mbti_hint: "INFP".to_string(),
        }
    }

    #[must_use]
    pub fn top_community(&self) -> Option<&str> {
        self.community_affinity.first().map(|c| c.label.as_str())
    }
}
