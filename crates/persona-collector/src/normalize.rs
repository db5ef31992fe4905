//! Conversion of raw listing children into [`ActivityItem`]s.

use chrono::{DateTime, Utc};
use persona_core::{ActivityItem, ActivityKind};

use crate::types::Thing;

const REDDIT_ORIGIN: &str = "https://www.reddit.com";

/// Longest text kept per item.
pub(crate) const MAX_TEXT_CHARS: usize = 4_000;

fn usable_body(text: Option<&str>) -> Option<&str> {
    text.map(str::trim)
        .filter(|t| !t.is_empty() && *t != "[deleted]" && *t != "[removed]")
}

pub(crate) fn timestamp(created_utc: f64) -> Option<DateTime<Utc>> {
    if !created_utc.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let secs = created_utc.trunc() as i64;
    DateTime::from_timestamp(secs, 0)
}

/// Normalizes one listing child. Returns `None` for unknown kinds, removed
/// content, or children missing a timestamp.
pub(crate) fn normalize_thing(thing: &Thing) -> Option<ActivityItem> {
    let kind = match thing.kind.as_str() {
        "t3" => ActivityKind::Post,
        "t1" => ActivityKind::Comment,
        _ => return None,
    };
    let data = &thing.data;

    let text = match kind {
        ActivityKind::Post => {
            let title = usable_body(data.title.as_deref());
            let body = usable_body(data.selftext.as_deref());
            match (title, body) {
                (Some(t), Some(b)) => format!("{t}\n\n{b}"),
                (Some(t), None) => t.to_string(),
                (None, Some(b)) => b.to_string(),
                (None, None) => return None,
            }
        }
        ActivityKind::Comment => usable_body(data.body.as_deref())?.to_string(),
    };

    let created_at = timestamp(data.created_utc?)?;
    let id = data
        .name
        .clone()
        .or_else(|| data.id.as_ref().map(|id| format!("{}_{id}", thing.kind)))?;
    let permalink = match data.permalink.as_deref() {
        Some(p) if p.starts_with("http") => p.to_string(),
        Some(p) => format!("{REDDIT_ORIGIN}{p}"),
        None => String::new(),
    };

    Some(ActivityItem {
        id,
        kind,
        community: data
            .subreddit
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
        text: text.chars().take(MAX_TEXT_CHARS).collect(),
        score: data.score,
        created_at,
        permalink,
    })
}
