//! Keyword tables for interest categories and personality-type indicators.

/// Interest categories and the keywords that signal them. Multi-word
/// keywords match as phrases.
pub(crate) const INTEREST_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "technology",
        &[
            "programming",
            "coding",
            "software",
            "tech",
            "computer",
            "ai",
            "machine learning",
        ],
    ),
    (
        "gaming",
        &["game", "gaming", "playstation", "xbox", "nintendo", "steam", "gamer"],
    ),
    (
        "sports",
        &["football", "basketball", "soccer", "baseball", "tennis", "sport", "athlete"],
    ),
    (
        "politics",
        &["politics", "political", "government", "election", "policy", "democracy"],
    ),
    (
        "science",
        &["science", "scientific", "research", "study", "experiment", "discovery"],
    ),
    (
        "entertainment",
        &["movie", "film", "music", "tv", "show", "entertainment", "celebrity"],
    ),
    (
        "finance",
        &["money", "finance", "investment", "stock", "trading", "economy"],
    ),
    (
        "health",
        &["health", "medical", "fitness", "exercise", "diet", "wellness"],
    ),
    (
        "education",
        &["education", "learning", "school", "university", "study", "academic"],
    ),
    (
        "travel",
        &["travel", "trip", "vacation", "destination", "tourism", "adventure"],
    ),
];

/// Indicator words for each side of the four type dichotomies, in
/// `(first, second)` order: E/I, S/N, T/F, J/P.
pub(crate) const TYPE_AXES: &[((char, &[&str]), (char, &[&str]))] = &[
    (
        ('E', &["social", "people", "group", "party", "friends", "outgoing"]),
        ('I', &["alone", "quiet", "private", "solitary", "introvert", "personal"]),
    ),
    (
        ('S', &["practical", "detail", "fact", "concrete", "specific", "realistic"]),
        ('N', &["creative", "imagination", "abstract", "theory", "possibility", "vision"]),
    ),
    (
        ('T', &["logic", "analysis", "reason", "objective", "factual", "systematic"]),
        ('F', &["feel", "emotion", "value", "relationship", "harmony", "compassion"]),
    ),
    (
        ('J', &["plan", "organize", "structure", "decide", "control", "schedule"]),
        ('P', &["flexible", "spontaneous", "open", "explore", "adapt", "curious"]),
    ),
];

/// `true` if `token` is `word` or its plural.
pub(crate) fn token_matches(token: &str, word: &str) -> bool {
    token == word || token.strip_suffix('s') == Some(word)
}
