//! Ranked lexical/phonetic search over code/description pairs.
//!
//! This is the repository-side ranking behind EAN resolution. It blends
//! three deterministic signals per product:
//!
//! - token-sort similarity (word order insensitive), weight 0.5
//! - character-sequence similarity, weight 0.3
//! - a flat phonetic bonus of 20 when the soundex-style keys agree
//!
//! A case-insensitive exact description match short-circuits to 100. Rows
//! below [`MIN_SIMILARITY`] are dropped; survivors come back sorted by
//! similarity descending, ties broken by code ascending.

use crate::engine::correct::similarity_ratio;
use crate::engine::fuzzy::token_sort_ratio;
use crate::repo::{Product, RankedMatch};

/// Rows scoring below this are noise, not candidates.
const MIN_SIMILARITY: f64 = 40.0;

const PHONETIC_BONUS: f64 = 20.0;

pub fn rank_products(description: &str, products: &[Product]) -> Vec<RankedMatch> {
    let needle = description.trim();
    if needle.is_empty() {
        return Vec::new();
    }
    let needle_lower = needle.to_lowercase();
    let needle_key = phonetic_key(needle);

    let mut rows: Vec<RankedMatch> = products
        .iter()
        .filter_map(|product| {
            let similarity = if product.description.to_lowercase() == needle_lower {
                100.0
            } else {
                let tokens = token_sort_ratio(needle, &product.description);
                let chars = 100.0 * similarity_ratio(needle, &product.description);
                let phonetic = if needle_key == phonetic_key(&product.description) {
                    PHONETIC_BONUS
                } else {
                    0.0
                };
                (0.5 * tokens + 0.3 * chars + phonetic).min(100.0)
            };
            let similarity = (similarity * 100.0).round() / 100.0;
            (similarity >= MIN_SIMILARITY).then(|| RankedMatch {
                code: product.code.clone(),
                description: product.description.clone(),
                similarity,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.code.cmp(&b.code))
    });
    rows
}

/// Soundex-style key over the first word: leading letter plus up to three
/// consonant-class digits, zero-padded. Empty input keys to "0000" so two
/// blanks never score a spurious phonetic bonus against real words.
fn phonetic_key(text: &str) -> String {
    let word: Vec<char> = text
        .chars()
        .skip_while(|c| !c.is_ascii_alphabetic())
        .take_while(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let Some((&first, rest)) = word.split_first() else {
        return "0000".to_string();
    };

    let mut key = String::with_capacity(4);
    key.push(first);
    let mut last_digit = soundex_digit(first);

    for &c in rest {
        let digit = soundex_digit(c);
        match digit {
            Some(d) if Some(d) != last_digit => {
                key.push(d);
                if key.len() == 4 {
                    break;
                }
                last_digit = Some(d);
            }
            Some(_) => {}
            None => {
                // Vowels and h/w/y reset the adjacency rule.
                if c != 'H' && c != 'W' {
                    last_digit = None;
                }
            }
        }
    }

    while key.len() < 4 {
        key.push('0');
    }
    key
}

fn soundex_digit(c: char) -> Option<char> {
    match c {
        'B' | 'F' | 'P' | 'V' => Some('1'),
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => Some('2'),
        'D' | 'T' => Some('3'),
        'L' => Some('4'),
        'M' | 'N' => Some('5'),
        'R' => Some('6'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: u64, code: &str, description: &str) -> Product {
        Product {
            id,
            code: code.into(),
            description: description.into(),
        }
    }

    #[test]
    fn phonetic_key_classic_examples() {
        assert_eq!(phonetic_key("Robert"), "R163");
        assert_eq!(phonetic_key("Rupert"), "R163");
        assert_eq!(phonetic_key("Tymczak"), "T522");
        assert_eq!(phonetic_key("Pfister"), "P236");
        assert_eq!(phonetic_key(""), "0000");
    }

    #[test]
    fn exact_description_scores_100_regardless_of_case() {
        let products = vec![product(1, "EAN1", "Harry Potter Book")];
        let rows = rank_products("harry potter book", &products);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].similarity, 100.0);
    }

    #[test]
    fn word_order_does_not_kill_the_score() {
        let products = vec![product(1, "EAN1", "Harry Potter Book")];
        let rows = rank_products("book potter harry", &products);
        assert!(!rows.is_empty());
        assert!(rows[0].similarity >= 50.0);
    }

    #[test]
    fn unrelated_text_is_filtered_out() {
        let products = vec![product(1, "EAN1", "Harry Potter Book")];
        let rows = rank_products("zzzz qqqq wwww", &products);
        assert!(rows.is_empty());
    }

    #[test]
    fn blank_query_returns_nothing() {
        let products = vec![product(1, "EAN1", "Harry Potter Book")];
        assert!(rank_products("   ", &products).is_empty());
    }

    #[test]
    fn rows_sorted_by_similarity_then_code() {
        let products = vec![
            product(1, "EAN2", "red apple juice"),
            product(2, "EAN1", "red apple juice"),
            product(3, "EAN3", "green apple juice"),
        ];
        let rows = rank_products("red apple juice", &products);
        assert!(rows.len() >= 2);
        assert_eq!(rows[0].code, "EAN1");
        assert_eq!(rows[1].code, "EAN2");
        assert!(rows.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }
}
