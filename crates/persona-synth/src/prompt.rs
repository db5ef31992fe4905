use std::fmt::Write as _;

use persona_core::{ActivityItem, FeatureProfile};

pub const SAMPLES_PER_KIND: usize = 5;
pub const SAMPLE_EXCERPT_CHARS: usize = 200;

/// The first [`SAMPLES_PER_KIND`] posts and comments, with text cut to
/// [`SAMPLE_EXCERPT_CHARS`]. Posts come first.
#[must_use]
pub fn select_samples(items: &[ActivityItem]) -> Vec<ActivityItem> {
    let posts = items.iter().filter(|i| i.is_post()).take(SAMPLES_PER_KIND);
    let comments = items.iter().filter(|i| !i.is_post()).take(SAMPLES_PER_KIND);
    posts
        .chain(comments)
        .map(|item| ActivityItem {
            text: item.excerpt(SAMPLE_EXCERPT_CHARS),
            ..item.clone()
        })
        .collect()
}

/// Renders the persona request sent to every provider in the chain.
#[must_use]
pub fn build_prompt(username: &str, profile: &FeatureProfile, samples: &[ActivityItem]) -> String {
    let mut prompt = String::with_capacity(4096);

    let _ = writeln!(
        prompt,
        "You are a user researcher. Build a persona for the Reddit user u/{username} \
         using only the activity summary and samples below."
    );
    prompt.push('\n');

    prompt.push_str("Activity summary:\n");
    let _ = writeln!(
        prompt,
        "- Items analyzed: {} ({} posts, {} comments)",
        profile.item_count, profile.post_count, profile.comment_count
    );
    let _ = writeln!(
        prompt,
        "- Sentiment: {:.0}% positive, {:.0}% neutral, {:.0}% negative",
        profile.sentiment.positive * 100.0,
        profile.sentiment.neutral * 100.0,
        profile.sentiment.negative * 100.0
    );
    let interests: Vec<&str> = profile
        .interest_weights
        .iter()
        .take(5)
        .map(|w| w.label.as_str())
        .collect();
    if !interests.is_empty() {
        let _ = writeln!(prompt, "- Key interests: {}", interests.join(", "));
    }
    let communities: Vec<String> = profile
        .community_affinity
        .iter()
        .take(5)
        .map(|c| format!("r/{}", c.label))
        .collect();
    if !communities.is_empty() {
        let _ = writeln!(prompt, "- Most active in: {}", communities.join(", "));
    }
    let _ = writeln!(
        prompt,
        "- Writing style: {} sentences, {} tone",
        profile.writing_style.complexity, profile.writing_style.tone
    );
    let _ = writeln!(
        prompt,
        "- Activity pattern: {}, engagement {}",
        profile.cadence.pattern, profile.engagement.level
    );
    let _ = writeln!(prompt, "- Personality hint: {}", profile.mbti_hint);

    if !samples.is_empty() {
        prompt.push_str("\nSamples:\n");
        for (idx, sample) in samples.iter().enumerate() {
            let _ = writeln!(
                prompt,
                "{}. [id {}, {} in r/{}, score {}] {}",
                idx + 1,
                sample.id,
                sample.kind,
                sample.community,
                sample.score,
                sample.text.replace('\n', " ")
            );
        }
    }

    prompt.push_str(
        "\nRespond with a single JSON object and nothing else, using these keys:\n\
         name, age, occupation, status, location, tier, archetype, personality_type,\n\
         traits (list), interests (list), behavior_habits (list), frustrations (list),\n\
         goals (list), social_views (list), quote (a real sentence from the samples),\n\
         motivations (object of 0-100 scores: convenience, wellness, speed, preferences,\n\
         comfort, learning, community), personality (object of 0-100 scores: introvert,\n\
         extrovert, intuition, sensing, feeling, thinking, perceiving, judging),\n\
         citations (list of objects with trait, evidence, source_id, subreddit, quote;\n\
         source_id must be the id of one of the samples above).\n\
         Leave a field null when the activity gives no evidence for it.\n",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use persona_core::ActivityKind;

    use super::*;

    fn item(kind: ActivityKind, n: usize) -> ActivityItem {
        ActivityItem {
            id: format!("{kind}_{n}"),
            kind,
            community: "rust".to_string(),
            text: "a".repeat(300),
            score: 1,
            created_at: Utc::now(),
            permalink: String::new(),
        }
    }

    #[test]
    fn samples_take_five_of_each_kind_truncated() {
        let mut items: Vec<ActivityItem> = (0..8).map(|n| item(ActivityKind::Comment, n)).collect();
        items.extend((0..3).map(|n| item(ActivityKind::Post, n)));

        let samples = select_samples(&items);
        assert_eq!(samples.len(), 8);
        assert!(samples[..3].iter().all(ActivityItem::is_post));
        assert_eq!(samples[3].id, "comment_0");
        assert!(samples
            .iter()
            .all(|s| s.text.chars().count() == SAMPLE_EXCERPT_CHARS + 3));
    }

    #[test]
    fn prompt_mentions_user_and_samples() {
        let items = vec![item(ActivityKind::Post, 0)];
        let samples = select_samples(&items);
        let prompt = build_prompt("alice", &FeatureProfile::insufficient(), &samples);
        assert!(prompt.contains("u/alice"));
        assert!(prompt.contains("1. [id post_0, post in r/rust, score 1]"));
        assert!(prompt.contains("source_id"));
        assert!(prompt.contains("JSON object"));
    }
}
