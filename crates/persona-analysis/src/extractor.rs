//! Derives a [`FeatureProfile`] from collected activity.

use std::collections::{BTreeSet, HashSet};

use chrono::Timelike;
use persona_core::{
    ActivityCadence, ActivityItem, ActivityKind, DayPattern, Engagement, EngagementLevel,
    FeatureProfile, PipelineConfig, SentimentDistribution, WeightedLabel, WritingStyle,
};

use crate::indicators::{token_matches, INTEREST_CATEGORIES, TYPE_AXES};
use crate::lexicon::lexicon_score;
use crate::text::{clean_text, sentences, tokens};

/// Polarity cut-offs for the sentiment buckets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentThresholds {
    /// Items scoring above this are positive.
    pub positive: f64,
    /// Items scoring below this are negative.
    pub negative: f64,
}

impl Default for SentimentThresholds {
    fn default() -> Self {
        Self {
            positive: 0.1,
            negative: -0.1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    thresholds: SentimentThresholds,
}

impl FeatureExtractor {
    #[must_use]
    pub fn new(thresholds: SentimentThresholds) -> Self {
        Self { thresholds }
    }

    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(SentimentThresholds {
            positive: config.sentiment_positive_threshold,
            negative: config.sentiment_negative_threshold,
        })
    }

    /// Builds the feature profile for `items`. Pure and infallible.
    ///
    /// An empty slice yields [`FeatureProfile::insufficient`].
    #[must_use]
    pub fn extract(&self, items: &[ActivityItem]) -> FeatureProfile {
        if items.is_empty() {
            return FeatureProfile::insufficient();
        }

        let cleaned: Vec<String> = items.iter().map(|i| clean_text(&i.text)).collect();
        let tokenized: Vec<Vec<String>> = cleaned.iter().map(|t| tokens(t)).collect();

        let post_count = items.iter().filter(|i| i.kind == ActivityKind::Post).count();
        let (interest_tags, interest_weights) = interests(items, &tokenized);

        let profile = FeatureProfile {
            item_count: items.len(),
            post_count,
            comment_count: items.len() - post_count,
            insufficient_data: false,
            sentiment: self.sentiment(&cleaned),
            interest_tags,
            interest_weights,
            community_affinity: community_affinity(items),
            cadence: cadence(items),
            writing_style: writing_style(&cleaned, &tokenized),
            engagement: engagement(items, post_count),
            mbti_hint: mbti_hint(&tokenized),
        };

        tracing::debug!(
            items = profile.item_count,
            interests = profile.interest_tags.len(),
            communities = profile.community_affinity.len(),
            mbti = %profile.mbti_hint,
            "extracted feature profile"
        );

        profile
    }

    fn sentiment(&self, texts: &[String]) -> SentimentDistribution {
        let mut positive = 0usize;
        let mut negative = 0usize;
        let mut polarity_sum = 0.0_f64;

        for text in texts {
            let polarity = f64::from(lexicon_score(text));
            polarity_sum += polarity;
            if polarity > self.thresholds.positive {
                positive += 1;
            } else if polarity < self.thresholds.negative {
                negative += 1;
            }
        }

        let total = ratio_base(texts.len());
        let neutral = texts.len() - positive - negative;
        SentimentDistribution {
            positive: as_f64(positive) / total,
            neutral: as_f64(neutral) / total,
            negative: as_f64(negative) / total,
            mean_polarity: polarity_sum / total,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(n: usize) -> f64 {
    n as f64
}

fn ratio_base(n: usize) -> f64 {
    as_f64(n.max(1))
}

/// Keyword hits per interest category, from item text and community names.
fn interests(
    items: &[ActivityItem],
    tokenized: &[Vec<String>],
) -> (BTreeSet<String>, Vec<WeightedLabel>) {
    let mut hits = vec![0usize; INTEREST_CATEGORIES.len()];

    for (item, item_tokens) in items.iter().zip(tokenized) {
        let joined = format!(" {} ", item_tokens.join(" "));
        let community = item.community.to_lowercase();

        for (idx, (_, keywords)) in INTEREST_CATEGORIES.iter().enumerate() {
            for keyword in *keywords {
                if keyword.contains(' ') {
                    hits[idx] += joined.matches(&format!(" {keyword} ")).count();
                } else {
                    hits[idx] += item_tokens
                        .iter()
                        .filter(|t| token_matches(t, keyword))
                        .count();
                }
            }
            if keywords
                .iter()
                .any(|k| k.len() >= 4 && !k.contains(' ') && community.contains(k))
            {
                hits[idx] += 1;
            }
        }
    }

    let mut weighted: Vec<WeightedLabel> = INTEREST_CATEGORIES
        .iter()
        .zip(&hits)
        .filter(|(_, count)| **count > 0)
        .map(|((name, _), count)| WeightedLabel {
            label: (*name).to_string(),
            weight: as_f64(*count),
        })
        .collect();
    weighted.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    let tags = weighted.iter().map(|w| w.label.clone()).collect();
    (tags, weighted)
}

/// Each community's share of items, most active first. Ties keep first-seen order.
fn community_affinity(items: &[ActivityItem]) -> Vec<WeightedLabel> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(c, _)| *c == item.community) {
            Some(entry) => entry.1 += 1,
            None => counts.push((item.community.as_str(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let total = ratio_base(items.len());
    counts
        .into_iter()
        .map(|(community, count)| WeightedLabel {
            label: community.to_string(),
            weight: as_f64(count) / total,
        })
        .collect()
}

fn cadence(items: &[ActivityItem]) -> ActivityCadence {
    let mut active_hours = [0u32; 24];
    let mut days = HashSet::new();
    for item in items {
        active_hours[item.created_at.hour() as usize] += 1;
        days.insert(item.created_at.date_naive());
    }

    let mut peak_hour = None;
    let mut peak_count = 0;
    for (hour, &count) in active_hours.iter().enumerate() {
        if count > peak_count {
            peak_count = count;
            peak_hour = u8::try_from(hour).ok();
        }
    }

    let night: u32 = active_hours
        .iter()
        .enumerate()
        .filter(|(hour, _)| *hour >= 22 || *hour <= 6)
        .map(|(_, &c)| c)
        .sum();
    let day: u32 = active_hours.iter().sum::<u32>() - night;
    let pattern = if night > day {
        DayPattern::NightOwl
    } else if day > night * 2 {
        DayPattern::EarlyBird
    } else {
        DayPattern::Balanced
    };

    ActivityCadence {
        items_per_day: as_f64(items.len()) / ratio_base(days.len()),
        active_days: days.len(),
        active_hours,
        peak_hour,
        pattern,
    }
}

fn writing_style(cleaned: &[String], tokenized: &[Vec<String>]) -> WritingStyle {
    let word_count: usize = tokenized.iter().map(Vec::len).sum();
    let sentence_count: usize = cleaned.iter().map(|t| sentences(t).count()).sum();
    let exclamations: usize = cleaned.iter().map(|t| t.matches('!').count()).sum();
    let questions: usize = cleaned.iter().map(|t| t.matches('?').count()).sum();

    let avg_words_per_sentence = as_f64(word_count) / ratio_base(sentence_count);
    let complexity = if avg_words_per_sentence > 20.0 {
        "complex"
    } else if avg_words_per_sentence > 15.0 {
        "moderate"
    } else {
        "simple"
    };

    let sentence_floor = as_f64(sentence_count) * 0.1;
    let tone = if as_f64(exclamations) > sentence_floor {
        "enthusiastic"
    } else if as_f64(questions) > sentence_floor {
        "inquisitive"
    } else {
        "neutral"
    };

    WritingStyle {
        avg_words_per_item: as_f64(word_count) / ratio_base(cleaned.len()),
        avg_words_per_sentence,
        complexity: complexity.to_string(),
        tone: tone.to_string(),
    }
}

fn engagement(items: &[ActivityItem], post_count: usize) -> Engagement {
    let total_score: i64 = items.iter().map(|i| i.score).sum();
    #[allow(clippy::cast_precision_loss)]
    let average_score = total_score as f64 / ratio_base(items.len());
    let level = if average_score > 50.0 && items.len() > 20 {
        EngagementLevel::High
    } else if average_score > 10.0 && items.len() > 10 {
        EngagementLevel::Moderate
    } else {
        EngagementLevel::Low
    };

    Engagement {
        average_score,
        total_score,
        comment_ratio: as_f64(items.len() - post_count) / ratio_base(items.len()),
        level,
    }
}

/// Four-letter type from indicator counts. The first letter of an axis needs
/// strictly more hits than the second to win.
fn mbti_hint(tokenized: &[Vec<String>]) -> String {
    let count = |words: &[&str]| -> usize {
        tokenized
            .iter()
            .flatten()
            .filter(|t| words.iter().any(|w| token_matches(t, w)))
            .count()
    };

    TYPE_AXES
        .iter()
        .map(|((first, first_words), (second, second_words))| {
            if count(*first_words) > count(*second_words) {
                *first
            } else {
                *second
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
