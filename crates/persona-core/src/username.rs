//! Username extraction and cache-key normalization.

use std::sync::LazyLock;

use regex::Regex;

static PROFILE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|/)(?:u|user)/([A-Za-z0-9_-]+)").expect("valid profile path regex")
});

/// Trimmed, lowercased form used as the cache and storage key.
#[must_use]
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Reddit usernames are 3–20 characters of ASCII letters, digits, `_` or `-`.
#[must_use]
pub fn is_valid_username(username: &str) -> bool {
    (3..=20).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Pulls a username out of a profile URL, `u/name`, `/user/name`, `@name`,
/// or a bare name. Returns `None` when the result is not a valid username.
#[must_use]
pub fn extract_username(input: &str) -> Option<String> {
    let trimmed = input.trim().trim_end_matches('/');
    let candidate = match PROFILE_PATH.captures(trimmed) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => trimmed.strip_prefix('@').unwrap_or(trimmed),
    };
    is_valid_username(candidate).then(|| candidate.to_string())
}
