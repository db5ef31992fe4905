//! General-purpose lexicon scorer for conversational text.

/// Word weights.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("good", 0.3),
    ("great", 0.4),
    ("awesome", 0.5),
    ("amazing", 0.5),
    ("wonderful", 0.5),
    ("excellent", 0.5),
    ("love", 0.5),
    ("loved", 0.5),
    ("like", 0.2),
    ("enjoy", 0.4),
    ("enjoyed", 0.4),
    ("happy", 0.4),
    ("glad", 0.3),
    ("thanks", 0.3),
    ("thank", 0.3),
    ("helpful", 0.4),
    ("beautiful", 0.4),
    ("best", 0.5),
    ("nice", 0.3),
    ("fun", 0.4),
    ("cool", 0.3),
    ("interesting", 0.3),
    ("recommend", 0.4),
    ("agree", 0.2),
    ("perfect", 0.5),
    ("fantastic", 0.5),
    ("excited", 0.4),
    ("win", 0.4),
    ("lol", 0.2),
    // Negative signals
    ("bad", -0.4),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("horrible", -0.6),
    ("worst", -0.6),
    ("hate", -0.6),
    ("hated", -0.6),
    ("disappointing", -0.5),
    ("disappointed", -0.5),
    ("frustrating", -0.5),
    ("frustrated", -0.5),
    ("annoying", -0.4),
    ("angry", -0.5),
    ("sad", -0.4),
    ("wrong", -0.3),
    ("stupid", -0.5),
    ("broken", -0.4),
    ("problem", -0.3),
    ("issue", -0.2),
    ("fail", -0.4),
    ("failed", -0.4),
    ("useless", -0.5),
    ("sucks", -0.5),
    ("boring", -0.4),
    ("disagree", -0.2),
    ("ugly", -0.4),
    ("scam", -0.6),
];

/// Tokens that flip the polarity of the word immediately after them.
const NEGATORS: &[&str] = &[
    "not", "no", "never", "dont", "don't", "isnt", "isn't", "wasnt", "wasn't", "cant", "can't",
    "didnt", "didn't", "doesnt", "doesn't",
];

/// Score a text string using the lexicon.
///
/// Splits text into lowercase words, sums matching weights (negated when the
/// previous word is a negator), and clamps the result to `[-1.0, 1.0]`.
/// Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    let mut negate = false;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic() && c != '\'')
            .to_lowercase();
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == w) {
            score += if negate { -weight } else { weight };
        }
        negate = NEGATORS.contains(&w.as_str());
    }
    score.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_returns_zero() {
        assert_eq!(lexicon_score(""), 0.0);
    }

    #[test]
    fn unknown_text_returns_zero() {
        assert_eq!(lexicon_score("the quick brown fox"), 0.0);
    }

    #[test]
    fn positive_keyword_returns_positive() {
        let score = lexicon_score("this thread is great, thanks!");
        assert!(score > 0.0, "expected positive score, got {score}");
    }

    #[test]
    fn negative_keyword_returns_negative() {
        let score = lexicon_score("what a terrible take");
        assert!(score < 0.0, "expected negative score, got {score}");
    }

    #[test]
    fn negation_flips_polarity() {
        let score = lexicon_score("this is not good");
        assert!(score < 0.0, "expected negated score, got {score}");
    }

    #[test]
    fn score_clamps_to_positive_one() {
        let text = "great excellent best love recommend perfect fantastic amazing";
        assert_eq!(lexicon_score(text), 1.0);
    }

    #[test]
    fn score_clamps_to_negative_one() {
        let text = "terrible awful horrible worst hate scam useless";
        assert_eq!(lexicon_score(text), -1.0);
    }
}
