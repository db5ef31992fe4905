//! Deterministic, network-free persona generator used as the last stage of
//! the provider chain.

use persona_core::{
    ActivityItem, Citation, DayPattern, EngagementLevel, FeatureProfile, PersonaMetadata, PersonaRecord,
    ScoreMap,
};

const MIN_QUOTE_CHARS: usize = 20;
const MAX_QUOTE_CHARS: usize = 300;
const CITED_TRAITS: usize = 3;
const DEFAULT_QUOTE: &str =
    "I enjoy participating in online discussions and sharing my thoughts with the community.";

/// Spectrum keys for each personality-type letter pair, in
/// `(letter, dominant key, opposite key)` form.
const SPECTRUM: &[(char, &str, &str)] = &[
    ('I', "introvert", "extrovert"),
    ('N', "intuition", "sensing"),
    ('F', "feeling", "thinking"),
    ('P', "perceiving", "judging"),
];
const DOMINANT_SCORE: u8 = 70;
const OPPOSITE_SCORE: u8 = 30;

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    /// Builds a persona from the feature profile and samples. Always succeeds
    /// and produces the same record for the same inputs, apart from
    /// `metadata.generated_at`.
    #[must_use]
    pub fn generate(
        &self,
        username: &str,
        profile: &FeatureProfile,
        samples: &[ActivityItem],
    ) -> PersonaRecord {
        let mut record = PersonaRecord::empty(username, PersonaMetadata::TEMPLATE_SOURCE);
        record.name = Some(username.to_string());
        record.tier = Some(
            match profile.engagement.level {
                EngagementLevel::High => "Influencer",
                EngagementLevel::Moderate => "Active Member",
                EngagementLevel::Low => "Reddit User",
            }
            .to_string(),
        );
        record.archetype = Some(archetype(&profile.mbti_hint).to_string());
        record.personality_type = Some(profile.mbti_hint.clone());
        record.traits = traits(profile);
        record.interests = interests(profile);
        record.motivations = motivations(profile);
        record.personality = personality(&profile.mbti_hint);
        record.behavior_habits = behavior_habits(profile);
        record.frustrations = vec![
            "Low-effort replies that ignore the question".to_string(),
            "Difficulty finding relevant content".to_string(),
            "Inconsistent community responses".to_string(),
        ];
        record.goals = goals(profile);
        record.social_views = vec!["Community-oriented".to_string()];
        record.quote = quote(samples);
        record.citations = citations(&record.traits, samples);
        record
    }
}

fn archetype(mbti: &str) -> &'static str {
    match mbti.chars().nth(1) {
        Some('N') if mbti.starts_with('E') => "The Creator",
        Some('N') => "The Explorer",
        Some(_) if mbti.contains('F') => "The Helper",
        _ => "The Achiever",
    }
}

fn traits(profile: &FeatureProfile) -> Vec<String> {
    let mut traits = Vec::new();
    let sentiment = &profile.sentiment;
    traits.push(if sentiment.positive > sentiment.negative {
        "Optimistic"
    } else if sentiment.negative > sentiment.positive {
        "Critical"
    } else {
        "Even-tempered"
    });
    traits.push(match profile.engagement.level {
        EngagementLevel::High => "Influential",
        EngagementLevel::Moderate => "Engaged",
        EngagementLevel::Low => "Casual",
    });
    traits.push(match profile.writing_style.tone.as_str() {
        "enthusiastic" => "Enthusiastic",
        "inquisitive" => "Curious",
        _ => "Measured",
    });
    if profile.top_community().is_some() {
        traits.push("Community-focused");
    }
    traits.into_iter().map(str::to_string).collect()
}

fn interests(profile: &FeatureProfile) -> Vec<String> {
    let mut interests: Vec<String> = profile
        .interest_weights
        .iter()
        .take(5)
        .map(|w| capitalize(&w.label))
        .collect();
    if interests.is_empty() {
        interests = profile
            .community_affinity
            .iter()
            .take(5)
            .map(|c| format!("r/{}", c.label))
            .collect();
    }
    if interests.is_empty() {
        interests = vec![
            "Community Discussion".to_string(),
            "Information Sharing".to_string(),
        ];
    }
    interests
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn motivations(profile: &FeatureProfile) -> ScoreMap {
    let has = |tag: &str| profile.interest_tags.contains(tag);
    let boost = |present: bool| if present { 70 } else { 40 };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let community = (40.0 + profile.engagement.comment_ratio.clamp(0.0, 1.0) * 50.0).round() as u8;

    ScoreMap::from_iter([
        ("convenience", 50),
        ("wellness", boost(has("health"))),
        ("speed", boost(profile.cadence.items_per_day > 5.0)),
        ("learning", boost(has("education") || has("science") || has("technology"))),
        ("entertainment", boost(has("gaming") || has("entertainment"))),
        ("community", community),
    ])
}

fn personality(mbti: &str) -> ScoreMap {
    let letters: Vec<char> = mbti.chars().collect();
    let mut scores = ScoreMap::new();
    for (idx, (letter, dominant, opposite)) in SPECTRUM.iter().enumerate() {
        let (d, o) = if letters.get(idx) == Some(letter) {
            (DOMINANT_SCORE, OPPOSITE_SCORE)
        } else {
            (OPPOSITE_SCORE, DOMINANT_SCORE)
        };
        scores.insert(*dominant, d);
        scores.insert(*opposite, o);
    }
    scores
}

fn behavior_habits(profile: &FeatureProfile) -> Vec<String> {
    let mut habits = Vec::new();
    if let Some(community) = profile.top_community() {
        habits.push(format!("Most active in r/{community}"));
    }
    if profile.cadence.active_days > 0 {
        habits.push(format!(
            "Averages {:.1} posts or comments per active day",
            profile.cadence.items_per_day
        ));
    }
    match profile.cadence.pattern {
        DayPattern::NightOwl => habits.push("Mostly active late at night".to_string()),
        DayPattern::EarlyBird => habits.push("Mostly active during the day".to_string()),
        DayPattern::Balanced => {}
    }
    if profile.engagement.comment_ratio > 0.5 {
        habits.push("Prefers commenting over starting new threads".to_string());
    } else if profile.post_count > 0 {
        habits.push("Regularly starts new threads".to_string());
    }
    if habits.is_empty() {
        habits.push("Regularly participates in online discussions".to_string());
    }
    habits
}

fn goals(profile: &FeatureProfile) -> Vec<String> {
    let mut goals = vec!["To connect with like-minded individuals".to_string()];
    if let Some(top) = profile.interest_weights.first() {
        goals.push(format!("To stay informed about {}", top.label));
    } else {
        goals.push("To stay informed about topics of interest".to_string());
    }
    goals.push("To share knowledge and experiences".to_string());
    goals
}

/// Pairs each of the leading traits with the next unused sample.
fn citations(traits: &[String], samples: &[ActivityItem]) -> Vec<Citation> {
    traits
        .iter()
        .take(CITED_TRAITS)
        .zip(samples)
        .map(|(trait_name, item)| {
            let citation = Citation {
                trait_name: trait_name.clone(),
                evidence: format!("Shows {} characteristics", trait_name.to_lowercase()),
                ..Citation::default()
            };
            crate::normalize::cite(citation, item)
        })
        .collect()
}

fn quote(samples: &[ActivityItem]) -> String {
    samples
        .iter()
        .map(|s| s.text.trim())
        .find(|t| t.chars().count() >= MIN_QUOTE_CHARS)
        .map_or_else(
            || DEFAULT_QUOTE.to_string(),
            |t| t.chars().take(MAX_QUOTE_CHARS).collect(),
        )
}
