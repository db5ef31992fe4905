//! Presentation series derived from a persona record and its feature profile.

use persona_core::{ChartAggregate, ChartPoint, FeatureProfile, PersonaRecord, SeriesKind};

const DEFAULT_TOP_N: usize = 10;

/// Hour ranges (inclusive start, exclusive end) for the activity-by-period
/// series. Night wraps past midnight.
const PERIODS: &[(&str, &[(usize, usize)])] = &[
    ("Morning", &[(6, 12)]),
    ("Afternoon", &[(12, 18)]),
    ("Evening", &[(18, 22)]),
    ("Night", &[(22, 24), (0, 6)]),
];

#[derive(Debug, Clone)]
pub struct ChartAggregateBuilder {
    top_n: usize,
}

impl Default for ChartAggregateBuilder {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl ChartAggregateBuilder {
    /// Caps the ranked series (`community_affinity`, `interests`) at `top_n`
    /// points.
    #[must_use]
    pub fn with_top_n(top_n: usize) -> Self {
        Self { top_n }
    }

    /// Builds every non-empty series.
    ///
    /// Points are ranked by value descending with ties kept in insertion
    /// order. Percentage values are clamped to `[0, 100]` and counts are
    /// never negative; non-finite values become 0.
    #[must_use]
    pub fn build(&self, record: &PersonaRecord, profile: &FeatureProfile) -> Vec<ChartAggregate> {
        let candidates = [
            series("motivations", SeriesKind::Percentage, motivations(record)),
            series(
                "personality_radar",
                SeriesKind::Percentage,
                personality_radar(record),
            ),
            series("big_five", SeriesKind::Percentage, big_five(record)),
            series("sentiment", SeriesKind::Percentage, sentiment(profile)),
            series(
                "community_affinity",
                SeriesKind::Percentage,
                self.community_affinity(profile),
            ),
            series(
                "interests",
                SeriesKind::Percentage,
                self.interests(record, profile),
            ),
            series(
                "activity_by_period",
                SeriesKind::Count,
                activity_by_period(profile),
            ),
            series("source_counts", SeriesKind::Count, source_counts(profile)),
        ];

        candidates
            .into_iter()
            .filter(|s| !s.points.is_empty())
            .collect()
    }

    fn community_affinity(&self, profile: &FeatureProfile) -> Vec<ChartPoint> {
        profile
            .community_affinity
            .iter()
            .take(self.top_n)
            .map(|c| point(format!("r/{}", c.label), c.weight * 100.0))
            .collect()
    }

    fn interests(&self, record: &PersonaRecord, profile: &FeatureProfile) -> Vec<ChartPoint> {
        let total_hits: f64 = profile.interest_weights.iter().map(|w| w.weight).sum();
        if total_hits > 0.0 {
            return rank(
                profile
                    .interest_weights
                    .iter()
                    .map(|w| point(title_case(&w.label), w.weight / total_hits * 100.0))
                    .collect(),
            )
            .into_iter()
            .take(self.top_n)
            .collect();
        }

        if record.interests.is_empty() {
            return Vec::new();
        }
        #[allow(clippy::cast_precision_loss)]
        let share = 100.0 / record.interests.len() as f64;
        record
            .interests
            .iter()
            .take(self.top_n)
            .map(|i| point(title_case(i), share))
            .collect()
    }
}

fn series(name: &str, kind: SeriesKind, points: Vec<ChartPoint>) -> ChartAggregate {
    let points = points
        .into_iter()
        .map(|p| ChartPoint {
            value: sanitize(p.value, kind),
            label: p.label,
        })
        .collect();
    ChartAggregate {
        name: name.to_string(),
        kind,
        points: rank(points),
    }
}

fn sanitize(value: f64, kind: SeriesKind) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    match kind {
        SeriesKind::Percentage => value.clamp(0.0, 100.0),
        SeriesKind::Count => value.max(0.0),
    }
}

/// Stable sort by value, highest first.
fn rank(mut points: Vec<ChartPoint>) -> Vec<ChartPoint> {
    points.sort_by(|a, b| b.value.total_cmp(&a.value));
    points
}

fn point(label: impl Into<String>, value: f64) -> ChartPoint {
    ChartPoint {
        label: label.into(),
        value,
    }
}

/// `social_connection` -> `Social Connection`.
fn title_case(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn motivations(record: &PersonaRecord) -> Vec<ChartPoint> {
    record
        .motivations
        .iter()
        .filter(|(_, score)| *score > 0)
        .map(|(name, score)| point(title_case(name), f64::from(score)))
        .collect()
}

fn personality_radar(record: &PersonaRecord) -> Vec<ChartPoint> {
    record
        .personality
        .iter()
        .filter(|(_, score)| *score > 0)
        .map(|(name, score)| point(title_case(name), f64::from(score)))
        .collect()
}

fn big_five(record: &PersonaRecord) -> Vec<ChartPoint> {
    if record.personality.is_empty() {
        return Vec::new();
    }
    let spectrum = |key: &str| f64::from(record.personality.get(key).unwrap_or(50));
    let neuroticism = (100.0 - (spectrum("introvert") + spectrum("extrovert")) / 2.0).max(0.0);

    [
        ("Openness", spectrum("intuition")),
        ("Conscientiousness", spectrum("judging")),
        ("Extraversion", spectrum("extrovert")),
        ("Agreeableness", spectrum("feeling")),
        ("Neuroticism", neuroticism),
    ]
    .into_iter()
    .filter(|(_, value)| *value > 0.0)
    .map(|(label, value)| point(label, value))
    .collect()
}

fn sentiment(profile: &FeatureProfile) -> Vec<ChartPoint> {
    if profile.insufficient_data {
        return Vec::new();
    }
    let s = &profile.sentiment;
    vec![
        point("Positive", s.positive * 100.0),
        point("Neutral", s.neutral * 100.0),
        point("Negative", s.negative * 100.0),
    ]
}

fn activity_by_period(profile: &FeatureProfile) -> Vec<ChartPoint> {
    let hours = &profile.cadence.active_hours;
    if hours.iter().all(|&c| c == 0) {
        return Vec::new();
    }
    PERIODS
        .iter()
        .map(|(label, ranges)| {
            let count: u32 = ranges
                .iter()
                .map(|&(start, end)| hours[start..end].iter().sum::<u32>())
                .sum();
            point(*label, f64::from(count))
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn source_counts(profile: &FeatureProfile) -> Vec<ChartPoint> {
    if profile.item_count == 0 {
        return Vec::new();
    }
    vec![
        point("Posts", profile.post_count as f64),
        point("Comments", profile.comment_count as f64),
    ]
}

#[cfg(test)]
mod tests {
    use persona_core::{ScoreMap, WeightedLabel};

    use super::*;

    fn record() -> PersonaRecord {
        PersonaRecord::empty("alice", "test")
    }

    fn find<'a>(charts: &'a [ChartAggregate], name: &str) -> Option<&'a ChartAggregate> {
        charts.iter().find(|c| c.name == name)
    }

    #[test]
    fn empty_input_yields_no_series() {
        let charts = ChartAggregateBuilder::default().build(&record(), &FeatureProfile::insufficient());
        assert!(charts.is_empty());
    }

    #[test]
    fn percentages_are_clamped_and_finite() {
        let mut profile = FeatureProfile::insufficient();
        profile.insufficient_data = false;
        profile.item_count = 2;
        profile.comment_count = 2;
        profile.community_affinity = vec![
            WeightedLabel {
                label: "rust".to_string(),
                weight: 3.5,
            },
            WeightedLabel {
                label: "golang".to_string(),
                weight: f64::NAN,
            },
            WeightedLabel {
                label: "zig".to_string(),
                weight: -0.2,
            },
        ];

        let charts = ChartAggregateBuilder::default().build(&record(), &profile);
        for chart in charts.iter().filter(|c| c.kind == SeriesKind::Percentage) {
            for p in &chart.points {
                assert!(p.value.is_finite());
                assert!((0.0..=100.0).contains(&p.value), "{} = {}", p.label, p.value);
            }
        }
        let affinity = find(&charts, "community_affinity").unwrap();
        assert_eq!(affinity.points[0].label, "r/rust");
        assert!((affinity.points[0].value - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut rec = record();
        rec.motivations = ScoreMap::from_iter([
            ("wellness", 40),
            ("social_connection", 80),
            ("convenience", 40),
            ("learning", 80),
        ]);

        let charts = ChartAggregateBuilder::default().build(&rec, &FeatureProfile::insufficient());
        let labels: Vec<&str> = find(&charts, "motivations")
            .unwrap()
            .points
            .iter()
            .map(|p| p.label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec!["Social Connection", "Learning", "Wellness", "Convenience"]
        );
    }

    #[test]
    fn big_five_derives_from_spectrum() {
        let mut rec = record();
        rec.personality = ScoreMap::from_iter([
            ("introvert", 70),
            ("extrovert", 30),
            ("intuition", 80),
            ("feeling", 60),
            ("judging", 40),
        ]);

        let charts = ChartAggregateBuilder::default().build(&rec, &FeatureProfile::insufficient());
        let big_five = find(&charts, "big_five").unwrap();
        let value = |label: &str| {
            big_five
                .points
                .iter()
                .find(|p| p.label == label)
                .map(|p| p.value)
                .unwrap()
        };
        assert!((value("Openness") - 80.0).abs() < f64::EPSILON);
        assert!((value("Conscientiousness") - 40.0).abs() < f64::EPSILON);
        assert!((value("Extraversion") - 30.0).abs() < f64::EPSILON);
        assert!((value("Agreeableness") - 60.0).abs() < f64::EPSILON);
        assert!((value("Neuroticism") - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn interests_fall_back_to_equal_split() {
        let mut rec = record();
        rec.interests = vec!["hiking".to_string(), "board_games".to_string()];

        let charts = ChartAggregateBuilder::default().build(&rec, &FeatureProfile::insufficient());
        let interests = find(&charts, "interests").unwrap();
        assert_eq!(interests.points.len(), 2);
        assert_eq!(interests.points[1].label, "Board Games");
        assert!((interests.points[0].value - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn activity_periods_wrap_midnight() {
        let mut profile = FeatureProfile::insufficient();
        profile.cadence.active_hours[23] = 2;
        profile.cadence.active_hours[3] = 1;
        profile.cadence.active_hours[9] = 1;

        let charts = ChartAggregateBuilder::default().build(&record(), &profile);
        let periods = find(&charts, "activity_by_period").unwrap();
        assert_eq!(periods.kind, SeriesKind::Count);
        assert_eq!(periods.points[0].label, "Night");
        assert!((periods.points[0].value - 3.0).abs() < f64::EPSILON);
        assert_eq!(periods.points[1].label, "Morning");
    }
}
