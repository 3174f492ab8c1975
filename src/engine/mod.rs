//! Return-invoice resolution engine.
//!
//! Turns a noisy, human-entered product description into a ranked set of
//! product and invoice candidates under three independent signals: semantic
//! similarity, fuzzy lexical similarity, and structured criteria matching.
//!
//! # Architecture
//!
//! - `catalog`: in-memory product catalog with precomputed embedding vectors
//! - `correct`: typo correction against the description vocabulary
//! - `search`: vector similarity search with fuzzy fallback
//! - `fuzzy`: token-based lexical scoring (degradation path)
//! - `ean`: EAN resolution via the repository ranked search
//! - `invoices`: multi-criteria invoice matching with confidence tiers
//! - `context`: engine context holding the snapshot and external handles

pub mod catalog;
pub mod context;
pub mod correct;
pub mod ean;
pub mod error;
pub mod fuzzy;
pub mod invoices;
pub mod search;

pub use catalog::CatalogSnapshot;
pub use context::{EngineContext, SystemStatus};
pub use error::EngineError;
pub use fuzzy::FuzzyMatch;
pub use invoices::{ConfidenceTier, InvoiceCriteria, MatchCandidate};
pub use search::{SearchOptions, SearchResult, SemanticMatch};

/// Default number of candidates returned by vector search and fuzzy fallback.
pub const DEFAULT_TOP_K: usize = 5;

/// Default Euclidean distance cutoff; entries at or beyond it are excluded.
pub const DEFAULT_MIN_DISTANCE: f64 = 1.0;

/// Default acceptance threshold for vocabulary correction (0-1 ratio scale).
pub const DEFAULT_CORRECTION_CUTOFF: f64 = 0.6;

/// Default relative price tolerance for invoice matching.
pub const DEFAULT_PRICE_MARGIN: f64 = 0.05;

/// Round to 2 decimal places (similarity and fuzzy score scales).
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to 4 decimal places (reported distances).
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
