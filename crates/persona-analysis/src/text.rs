//! Text cleanup and tokenization shared by the extractors.

use std::sync::LazyLock;

use regex::Regex;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("valid url regex"));
static MD_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid markdown link regex"));
static MD_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\*{1,3}|_{2})([^*_]+)(\*{1,3}|_{2})").expect("valid emphasis regex"));

/// Strips markdown links (keeping their text), bare URLs, and emphasis
/// markers, then collapses whitespace.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let text = MD_LINK.replace_all(text, "$1");
    let text = URL.replace_all(&text, " ");
    let text = MD_EMPHASIS.replace_all(&text, "$2");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase alphanumeric tokens.
#[must_use]
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\'').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Non-empty sentences, split on `.`, `!`, and `?`.
pub fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
