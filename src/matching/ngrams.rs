//! Text normalization and word n-grams.

use std::collections::BTreeSet;

/// Largest n-gram size produced for a tweet.
pub const MAX_NGRAM: usize = 4;

/// Lowercased words with ASCII punctuation removed.
pub fn tokens(text: &str) -> Vec<String> {
    let stripped: String = text.chars().filter(|c| !c.is_ascii_punctuation()).collect();
    stripped.split_whitespace().map(str::to_lowercase).collect()
}

/// Canonical form used for exact name matching: lowercased, ASCII
/// punctuation stripped, whitespace collapsed to single spaces.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    tokens(text).join(" ")
}

/// Contiguous runs of `n` tokens joined by single spaces.
#[must_use]
pub fn ngrams(tokens: &[String], n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    tokens.windows(n).map(|window| window.join(" ")).collect()
}

/// Distinct n-grams of sizes `1..=MAX_NGRAM`.
#[must_use]
pub fn tweet_ngrams(text: &str) -> BTreeSet<String> {
    let tokens = tokens(text);
    (1..=MAX_NGRAM).flat_map(|n| ngrams(&tokens, n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_is_stripped_before_splitting() {
        assert_eq!(tokens("Great brunch @ Kim's Diner!!"), vec!["great", "brunch", "kims", "diner"]);
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  Kim's \t Diner "), "kims diner");
        assert_eq!(normalize_text("7-Eleven"), "7eleven");
    }

    #[test]
    fn ngrams_cover_sizes_one_to_four() {
        let grams = tweet_ngrams("a b c d e");
        assert!(grams.contains("a"));
        assert!(grams.contains("b c"));
        assert!(grams.contains("a b c d"));
        assert!(!grams.contains("a b c d e"));
        // 5 + 4 + 3 + 2
        assert_eq!(grams.len(), 14);
    }

    #[test]
    fn short_text_yields_only_short_grams() {
        let words = tokens("hello world");
        assert_eq!(ngrams(&words, 3), Vec::<String>::new());
        assert_eq!(ngrams(&words, 2), vec!["hello world"]);
        assert!(tweet_ngrams("   ").is_empty());
    }
}
