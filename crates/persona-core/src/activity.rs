use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Post,
    Comment,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityKind::Post => write!(f, "post"),
            ActivityKind::Comment => write!(f, "comment"),
        }
    }
}

/// One normalized unit of public activity: a submission or a comment.
///
/// For posts, `text` holds the title followed by the self-text body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub id: String,
    pub kind: ActivityKind,
    pub community: String,
    pub text: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    pub permalink: String,
}

impl ActivityItem {
    #[must_use]
    pub fn is_post(&self) -> bool {
        self.kind == ActivityKind::Post
    }

    /// Returns the first `max_chars` characters of the text, with an ellipsis
    /// appended when the text was cut.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str) -> ActivityItem {
        ActivityItem {
            id: "t3_abc".to_string(),
            kind: ActivityKind::Post,
            community: "rust".to_string(),
            text: text.to_string(),
            score: 3,
            created_at: Utc::now(),
            permalink: "https://www.reddit.com/r/rust/comments/abc/".to_string(),
        }
    }

    #[test]
    fn excerpt_leaves_short_text_untouched() {
        assert_eq!(item("hello").excerpt(10), "hello");
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        assert_eq!(item("héllo wörld").excerpt(5), "héllo...");
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&ActivityKind::Comment).unwrap();
        assert_eq!(json, "\"comment\"");
    }
}
