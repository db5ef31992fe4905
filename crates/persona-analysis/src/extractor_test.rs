use chrono::{TimeZone, Utc};
use persona_core::{ActivityItem, ActivityKind, DayPattern, EngagementLevel};

use super::*;

fn item(kind: ActivityKind, community: &str, text: &str, score: i64, hour: u32) -> ActivityItem {
    ActivityItem {
        id: format!("t1_{community}_{hour}"),
        kind,
        community: community.to_string(),
        text: text.to_string(),
        score,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
        permalink: String::new(),
    }
}

fn comment(community: &str, text: &str) -> ActivityItem {
    item(ActivityKind::Comment, community, text, 1, 12)
}

#[test]
fn empty_input_is_insufficient() {
    let profile = FeatureExtractor::default().extract(&[]);
    assert!(profile.insufficient_data);
    assert_eq!(profile.item_count, 0);
    assert!((profile.sentiment.total() - 1.0).abs() < 1e-9);
}

#[test]
fn sentiment_fractions_sum_to_one() {
    let items = vec![
        comment("rust", "This is great, thanks for the help"),
        comment("rust", "What a terrible awful take"),
        comment("rust", "The meeting is on tuesday"),
        comment("rust", "I love this, amazing work"),
    ];
    let profile = FeatureExtractor::default().extract(&items);

    assert!(!profile.insufficient_data);
    assert!((profile.sentiment.total() - 1.0).abs() < 1e-9);
    assert!((profile.sentiment.positive - 0.5).abs() < 1e-9);
    assert!((profile.sentiment.negative - 0.25).abs() < 1e-9);
    assert!((profile.sentiment.neutral - 0.25).abs() < 1e-9);
    assert!(profile.sentiment.mean_polarity > 0.0);
}

#[test]
fn thresholds_from_config_shift_buckets() {
    let items = vec![comment("rust", "good")];
    let strict = FeatureExtractor::new(SentimentThresholds {
        positive: 0.5,
        negative: -0.5,
    });
    let profile = strict.extract(&items);
    assert!((profile.sentiment.neutral - 1.0).abs() < 1e-9);
}

#[test]
fn community_ties_keep_first_seen_order() {
    let items = vec![
        comment("gaming", "hello"),
        comment("science", "hello"),
        comment("science", "hello"),
        comment("gaming", "hello"),
        comment("cooking", "hello"),
    ];
    let profile = FeatureExtractor::default().extract(&items);
    let labels: Vec<&str> = profile
        .community_affinity
        .iter()
        .map(|c| c.label.as_str())
        .collect();
    assert_eq!(labels, vec!["gaming", "science", "cooking"]);

    let total: f64 = profile.community_affinity.iter().map(|c| c.weight).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert_eq!(profile.top_community(), Some("gaming"));
}

#[test]
fn interests_count_keywords_and_phrases() {
    let items = vec![
        comment("pcmasterrace", "Playing games on steam all weekend"),
        comment("learnprogramming", "Started a machine learning course, coding daily"),
    ];
    let profile = FeatureExtractor::default().extract(&items);

    assert!(profile.interest_tags.contains("gaming"));
    assert!(profile.interest_tags.contains("technology"));
    let technology = profile
        .interest_weights
        .iter()
        .find(|w| w.label == "technology")
        .unwrap();
    // "machine learning", "coding", and the community name
    assert!(technology.weight >= 3.0);
    assert!(profile
        .interest_weights
        .windows(2)
        .all(|pair| pair[0].weight >= pair[1].weight));
}

#[test]
fn cadence_detects_night_owl() {
    let items = vec![
        item(ActivityKind::Comment, "a", "late", 1, 23),
        item(ActivityKind::Comment, "a", "late", 1, 23),
        item(ActivityKind::Comment, "a", "late", 1, 2),
        item(ActivityKind::Comment, "a", "noon", 1, 13),
    ];
    let profile = FeatureExtractor::default().extract(&items);

    assert_eq!(profile.cadence.pattern, DayPattern::NightOwl);
    assert_eq!(profile.cadence.peak_hour, Some(23));
    assert_eq!(profile.cadence.active_hours[23], 2);
    assert_eq!(profile.cadence.active_days, 1);
    assert!((profile.cadence.items_per_day - 4.0).abs() < 1e-9);
}

#[test]
fn engagement_levels_follow_average_and_volume() {
    let low: Vec<ActivityItem> = (0..5)
        .map(|_| item(ActivityKind::Post, "a", "text", 100, 10))
        .collect();
    let profile = FeatureExtractor::default().extract(&low);
    assert_eq!(profile.engagement.level, EngagementLevel::Low);
    assert_eq!(profile.engagement.total_score, 500);
    assert_eq!(profile.post_count, 5);

    let high: Vec<ActivityItem> = (0..25)
        .map(|_| item(ActivityKind::Comment, "a", "text", 80, 10))
        .collect();
    let profile = FeatureExtractor::default().extract(&high);
    assert_eq!(profile.engagement.level, EngagementLevel::High);
    assert!((profile.engagement.comment_ratio - 1.0).abs() < 1e-9);
}

#[test]
fn writing_style_reports_tone() {
    let items = vec![comment("a", "Wow! This is it! So good!")];
    let profile = FeatureExtractor::default().extract(&items);
    assert_eq!(profile.writing_style.tone, "enthusiastic");
    assert_eq!(profile.writing_style.complexity, "simple");
}

#[test]
fn mbti_hint_prefers_second_letter_on_ties() {
    let profile = FeatureExtractor::default().extract(&[comment("a", "nothing relevant here")]);
    assert_eq!(profile.mbti_hint, "INFP");

    let items = vec![comment(
        "a",
        "Party with friends, practical facts, logic and analysis, plan and schedule",
    )];
    let profile = FeatureExtractor::default().extract(&items);
    assert_eq!(profile.mbti_hint, "ESTJ");
}
