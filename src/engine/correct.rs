//! Lexical correction of noisy query text against the catalog vocabulary.
//!
//! Human-entered return descriptions are full of typos; correcting them
//! against the known description vocabulary before the embedding call keeps
//! the vector search from chasing misspellings. The corrector is deterministic
//! and idempotent: a corrected string is itself in the vocabulary, so running
//! it twice is a no-op.

/// Character-level similarity ratio in `[0.0, 1.0]`.
///
/// Computed as `2 * lcs / (|a| + |b|)` over lowercased chars, where `lcs` is
/// the longest common subsequence length. Identical strings score 1.0,
/// disjoint strings 0.0.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let lcs = lcs_length(&a, &b);
    (2 * lcs) as f64 / (a.len() + b.len()) as f64
}

/// Longest common subsequence length, two-row dynamic programming.
fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Correct `raw` against the known vocabulary.
///
/// Returns the vocabulary entry with the highest similarity ratio, provided
/// that ratio exceeds `cutoff`; otherwise returns `raw` unchanged. Ties are
/// broken by vocabulary order, so equal inputs over an equal vocabulary always
/// produce the same output.
pub fn correct<'a, I>(raw: &str, vocabulary: I, cutoff: f64) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(f64, &str)> = None;

    for candidate in vocabulary {
        let ratio = similarity_ratio(raw, candidate);
        if best.map(|(r, _)| ratio > r).unwrap_or(true) {
            best = Some((ratio, candidate));
        }
    }

    match best {
        Some((ratio, candidate)) if ratio > cutoff => candidate.to_string(),
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DEFAULT_CORRECTION_CUTOFF;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity_ratio("harry potter", "harry potter"), 1.0);
    }

    #[test]
    fn ratio_is_case_insensitive() {
        assert_eq!(similarity_ratio("HARRY", "harry"), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("abc", ""), 0.0);
        assert_eq!(similarity_ratio("", "abc"), 0.0);
    }

    #[test]
    fn typo_scores_above_default_cutoff() {
        let ratio = similarity_ratio("harry poter", "Harry Potter Book");
        assert!(ratio > DEFAULT_CORRECTION_CUTOFF, "ratio was {ratio}");
    }

    #[test]
    fn correct_fixes_typo_against_vocabulary() {
        let vocab = ["Harry Potter Book", "Lord of the Rings"];
        let corrected = correct(
            "harry poter",
            vocab.iter().copied(),
            DEFAULT_CORRECTION_CUTOFF,
        );
        assert_eq!(corrected, "Harry Potter Book");
    }

    #[test]
    fn correct_leaves_unrelated_input_unchanged() {
        let vocab = ["Harry Potter Book"];
        let corrected = correct("qqqq", vocab.iter().copied(), DEFAULT_CORRECTION_CUTOFF);
        assert_eq!(corrected, "qqqq");
    }

    #[test]
    fn correct_with_empty_vocabulary_is_identity() {
        let corrected = correct("anything", std::iter::empty(), DEFAULT_CORRECTION_CUTOFF);
        assert_eq!(corrected, "anything");
    }

    #[test]
    fn correct_is_idempotent() {
        let vocab = ["Harry Potter Book", "Game of Thrones"];
        let once = correct(
            "harry poter",
            vocab.iter().copied(),
            DEFAULT_CORRECTION_CUTOFF,
        );
        let twice = correct(&once, vocab.iter().copied(), DEFAULT_CORRECTION_CUTOFF);
        assert_eq!(once, twice);
    }

    #[test]
    fn ties_resolve_to_first_vocabulary_entry() {
        // Both candidates are equally distant from the input.
        let vocab = ["abcd", "abce"];
        let corrected = correct("abcf", vocab.iter().copied(), 0.5);
        assert_eq!(corrected, "abcd");
    }
}
