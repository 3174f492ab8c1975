//! Token-based fuzzy scoring over the full catalog.
//!
//! This is the path of last resort: it runs when vector search yields nothing
//! within tolerance, or when the embedding provider is down. It needs no
//! network access and no stored vectors, only the catalog descriptions, which
//! is what lets the engine degrade gracefully. The scan is O(catalog) per
//! call, parallelized with rayon.

use rayon::prelude::*;
use serde::Serialize;

use crate::engine::correct::similarity_ratio;
use crate::engine::round2;
use crate::repo::Product;

/// A catalog entry scored by lexical similarity, 0-100.
///
/// The `score` scale is NOT comparable to the semantic `similarity` scale;
/// the two are reported in separate lists and never merged into one sort key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzyMatch {
    pub id: u64,
    pub code: String,
    pub description: String,
    pub score: f64,
}

/// Token-order-insensitive similarity ratio, 0-100.
///
/// Both strings are lowercased, split on non-alphanumeric characters, sorted
/// and rejoined before the character ratio is taken, so "book potter harry"
/// and "harry potter book" score 100.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    100.0 * similarity_ratio(&token_sort_key(a), &token_sort_key(b))
}

fn token_sort_key(text: &str) -> String {
    let mut tokens: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    tokens.sort();
    tokens.join(" ")
}

/// Score every catalog product against `corrected` and return the `top_k`
/// best, descending by score with ties broken by catalog order.
pub fn fallback(corrected: &str, products: &[Product], top_k: usize) -> Vec<FuzzyMatch> {
    let mut scored: Vec<(usize, f64)> = products
        .par_iter()
        .enumerate()
        .map(|(idx, product)| (idx, round2(token_sort_ratio(corrected, &product.description))))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(idx, score)| {
            let product = &products[idx];
            FuzzyMatch {
                id: product.id,
                code: product.code.clone(),
                description: product.description.clone(),
                score,
            }
        })
        .collect()
}
