use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::ActivityKind;
use crate::score_map::ScoreMap;

/// Best-guess demographic attributes. Every field is optional because
/// providers frequently decline to guess.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Links one persona trait to the activity item that evidences it.
///
/// `source_id` names an item from the sampled activity; the remaining
/// source fields are filled from that item once it is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(rename = "trait", default)]
    pub trait_name: String,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub source_type: Option<ActivityKind>,
    #[serde(default)]
    pub community: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub quote: String,
}

/// Provenance of a persona record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaMetadata {
    /// Provider id that produced the record, or `template`.
    pub source: String,
    #[serde(default)]
    pub model: Option<String>,
    confidence: f64,
    #[serde(default)]
    pub posts_analyzed: usize,
    #[serde(default)]
    pub comments_analyzed: usize,
    pub generated_at: DateTime<Utc>,
}

impl PersonaMetadata {
    pub const TEMPLATE_SOURCE: &'static str = "template";

    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            model: None,
            confidence: 0.0,
            posts_analyzed: 0,
            comments_analyzed: 0,
            generated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Sets the confidence, clamped to `[0, 1]`. Non-finite values become 0.
    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    #[must_use]
    pub fn is_template(&self) -> bool {
        self.source == Self::TEMPLATE_SOURCE
    }
}

/// The canonical, schema-valid persona output.
///
/// Score maps are bounded to `0..=100` by [`ScoreMap`]; list fields default
/// to empty when absent from serialized input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaRecord {
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub demographics: Demographics,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub archetype: Option<String>,
    #[serde(default)]
    pub personality_type: Option<String>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub motivations: ScoreMap,
    #[serde(default)]
    pub personality: ScoreMap,
    #[serde(default)]
    pub behavior_habits: Vec<String>,
    #[serde(default)]
    pub frustrations: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub social_views: Vec<String>,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub metadata: PersonaMetadata,
}

impl PersonaRecord {
    /// An empty record for `username`, attributed to `source`.
    #[must_use]
    pub fn empty(username: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            name: None,
            demographics: Demographics::default(),
            tier: None,
            archetype: None,
            personality_type: None,
            traits: Vec::new(),
            motivations: ScoreMap::new(),
            personality: ScoreMap::new(),
            behavior_habits: Vec::new(),
            frustrations: Vec::new(),
            goals: Vec::new(),
            interests: Vec::new(),
            social_views: Vec::new(),
            quote: String::new(),
            citations: Vec::new(),
            metadata: PersonaMetadata::new(source),
        }
    }
}
