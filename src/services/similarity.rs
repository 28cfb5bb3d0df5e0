//! String similarity and description normalization
//!
//! Similarity uses the longest-common-block recursion of the classic
//! `similar_text` algorithm: find the longest common substring, then recurse
//! into the pieces to its left and to its right. The score is
//! `2 * matched / (len(a) + len(b))`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Words that never become rule keywords
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from", "up",
    "about", "into", "through", "during", "before", "after", "above", "below", "between", "among",
    "purchase", "payment", "transaction", "debit", "credit", "card", "pos", "withdrawal",
    "deposit", "transfer", "fee", "charge",
];

static NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d{4}\s*\d{4}\s*\d{4}\s*\d{4}",
        r"\d{2}/\d{2}/\d{4}",
        r"\$\d+\.\d{2}",
        r"\b\d+\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("noise pattern is valid"))
    .collect()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid pattern"));

/// Number of characters shared by the two sequences
fn similar_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (mut best, mut pos_a, mut pos_b) = (0, 0, 0);
    for i in 0..a.len() {
        for j in 0..b.len() {
            let mut k = 0;
            while i + k < a.len() && j + k < b.len() && a[i + k] == b[j + k] {
                k += 1;
            }
            if k > best {
                best = k;
                pos_a = i;
                pos_b = j;
            }
        }
    }

    if best == 0 {
        return 0;
    }

    best + similar_chars(&a[..pos_a], &b[..pos_b])
        + similar_chars(&a[pos_a + best..], &b[pos_b + best..])
}

/// Similarity in [0, 1] of two strings, case-insensitive and trimmed
///
/// Two empty strings score 0. Arguments are compared in a canonical order,
/// so `similarity(a, b) == similarity(b, a)`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    let (first, second) = if a <= b { (a, b) } else { (b, a) };

    let first: Vec<char> = first.chars().collect();
    let second: Vec<char> = second.chars().collect();
    let total = first.len() + second.len();
    if total == 0 {
        return 0.0;
    }

    (2 * similar_chars(&first, &second)) as f64 / total as f64
}

/// Strip card numbers, dates, dollar amounts and bare numbers; lowercase and
/// collapse whitespace
pub fn normalize_description(description: &str) -> String {
    let mut normalized = description.to_string();
    for pattern in NOISE.iter() {
        normalized = pattern.replace_all(&normalized, "").into_owned();
    }
    WHITESPACE
        .replace_all(&normalized.to_lowercase(), " ")
        .trim()
        .to_string()
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Distinct meaningful words of a description, in first-seen order
pub fn extract_keywords(description: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for word in normalize_description(description).split_whitespace() {
        if word.chars().count() >= 3 && !is_stop_word(word) && !keywords.iter().any(|k| k == word)
        {
            keywords.push(word.to_string());
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_similarity_identity_and_empty() {
        assert!(close(similarity("Netflix", "netflix "), 1.0));
        assert!(close(similarity("", ""), 0.0));
        assert!(close(similarity("abc", ""), 0.0));
        assert!(close(similarity("abc", "xyz"), 0.0));
    }

    #[test]
    fn test_similarity_known_values() {
        // "wor" then "d"
        assert!(close(similarity("World", "word"), 2.0 * 4.0 / 9.0));
        assert!(close(similarity("Coffee", "toffee"), 2.0 * 5.0 / 12.0));
    }

    #[test]
    fn test_similarity_symmetric() {
        let pairs = [("STARBUCKS #123", "Starbucks Coffee"), ("abcd", "dcba"), ("amzn mktp", "amazon")];
        for (a, b) in pairs {
            assert!(close(similarity(a, b), similarity(b, a)), "{} / {}", a, b);
        }
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(
            normalize_description("POS PURCHASE 1234 5678 9012 3456  Whole Foods 03/14/2025 $45.10"),
            "pos purchase whole foods"
        );
        assert_eq!(normalize_description("STARBUCKS #123"), "starbucks #");
        assert_eq!(normalize_description("  Uber   Trip  "), "uber trip");
    }

    #[test]
    fn test_similarity_keeps_digits() {
        assert!(close(similarity("STARBUCKS #123", "Starbucks Coffee"), 20.0 / 30.0));
        assert!(close(similarity("ACH 1234 RENT", "ACH 9876 RENT"), 18.0 / 26.0));
    }

    #[test]
    fn test_extract_keywords() {
        assert_eq!(
            extract_keywords("DEBIT CARD PURCHASE Whole Foods Market whole 123"),
            vec!["whole", "foods", "market"]
        );
        assert!(extract_keywords("the fee at pos").is_empty());
    }
}
