//! Integration tests wiring the engine context to real stores.

mod store;

use crate::embed::{EmbedError, EmbedMode, EmbedTextProvider};

/// Deterministic embedder: maps known phrases to fixed vectors so tests can
/// steer the vector path without a network.
pub struct TableEmbedder {
    pub entries: Vec<(&'static str, Vec<f32>)>,
    pub fallback: Vec<f32>,
}

impl EmbedTextProvider for TableEmbedder {
    fn embed(&self, text: &str, _mode: EmbedMode) -> Result<Vec<f32>, EmbedError> {
        let lower = text.to_lowercase();
        Ok(self
            .entries
            .iter()
            .find(|(phrase, _)| phrase.to_lowercase() == lower)
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Embedder that always fails, simulating a provider outage.
pub struct OfflineEmbedder;

impl EmbedTextProvider for OfflineEmbedder {
    fn embed(&self, _text: &str, _mode: EmbedMode) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::EmptyVector)
    }
}
