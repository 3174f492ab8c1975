//! Semantic product search with lexical fallback.
//!
//! The canonical pipeline: trim the input, correct it against the catalog
//! vocabulary, embed the corrected text, rank catalog entries by Euclidean
//! distance, and convert retained distances to a similarity percentage.
//! Whenever the vector path produces nothing (empty catalog, provider down,
//! nothing under the distance cutoff) the pipeline falls through to the fuzzy
//! token scan instead of failing.

use serde::Serialize;

use crate::embed::{EmbedMode, EmbedTextProvider};
use crate::engine::catalog::CatalogSnapshot;
use crate::engine::correct;
use crate::engine::fuzzy::{self, FuzzyMatch};
use crate::engine::{round2, round4};
use crate::engine::{DEFAULT_CORRECTION_CUTOFF, DEFAULT_MIN_DISTANCE, DEFAULT_TOP_K};

/// A catalog entry retained by vector search.
///
/// `similarity = 100 / (1 + distance)`, so 100.00 means distance zero. The
/// value is only meaningful relative to other results of the same query; no
/// cross-query normalization is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticMatch {
    pub id: u64,
    pub code: String,
    pub description: String,
    pub similarity: f64,
    pub distance: f64,
}

/// Outcome of one product search. In the common case exactly one of
/// `semantic_matches` / `fuzzy_matches` is non-empty; both are empty only
/// when the catalog itself is empty.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query_original: String,
    pub query_normalized: String,
    pub semantic_matches: Vec<SemanticMatch>,
    pub fuzzy_matches: Vec<FuzzyMatch>,
}

/// Caller-tunable knobs for the search pipeline.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub top_k: usize,
    pub min_distance: f64,
    pub correction_cutoff: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_distance: DEFAULT_MIN_DISTANCE,
            correction_cutoff: DEFAULT_CORRECTION_CUTOFF,
        }
    }
}

/// Run the full search pipeline for one description.
///
/// Never fails: provider errors and empty vector results degrade to the
/// fuzzy fallback, and an empty catalog yields an empty result.
pub fn search_products(
    snapshot: &CatalogSnapshot,
    embedder: &dyn EmbedTextProvider,
    options: &SearchOptions,
    description: &str,
) -> SearchResult {
    let original = description.trim().to_string();
    let normalized = correct::correct(&original, snapshot.vocabulary(), options.correction_cutoff);

    let mut result = SearchResult {
        query_original: original,
        query_normalized: normalized,
        semantic_matches: Vec::new(),
        fuzzy_matches: Vec::new(),
    };

    if snapshot.is_empty() {
        return result;
    }

    let query_vector = match embedder.embed(&result.query_normalized, EmbedMode::Query) {
        Ok(vector) => vector,
        Err(err) => {
            log::warn!("embedding unavailable, falling back to fuzzy matching: {err}");
            result.fuzzy_matches =
                fuzzy::fallback(&result.query_normalized, snapshot.products(), options.top_k);
            return result;
        }
    };

    result.semantic_matches = snapshot
        .nearest(&query_vector, options.top_k, options.min_distance)
        .into_iter()
        .map(|(idx, distance)| {
            let product = &snapshot.products()[idx];
            SemanticMatch {
                id: product.id,
                code: product.code.clone(),
                description: product.description.clone(),
                similarity: round2(100.0 / (1.0 + distance)),
                distance: round4(distance),
            }
        })
        .collect();

    if result.semantic_matches.is_empty() {
        log::debug!("no vectors within tolerance, falling back to fuzzy matching");
        result.fuzzy_matches =
            fuzzy::fallback(&result.query_normalized, snapshot.products(), options.top_k);
    }

    result
}
