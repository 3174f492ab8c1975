use std::path::Path;

use serde::{Deserialize, Serialize};

const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
const DEFAULT_EMBEDDING_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration for the embedding provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name, also baked into vectors.bin as its identity hash
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Provider base URL
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// API key; the GOOGLE_API_KEY environment variable takes precedence
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_endpoint() -> String {
    DEFAULT_EMBEDDING_ENDPOINT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Tuning knobs for the search pipeline
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Euclidean distance cutoff; matches at or beyond it are discarded
    #[serde(default = "default_min_distance")]
    pub min_distance: f64,

    /// Acceptance threshold for vocabulary typo correction [0.0, 1.0]
    #[serde(default = "default_correction_cutoff")]
    pub correction_cutoff: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: crate::engine::DEFAULT_TOP_K,
            min_distance: crate::engine::DEFAULT_MIN_DISTANCE,
            correction_cutoff: crate::engine::DEFAULT_CORRECTION_CUTOFF,
        }
    }
}

fn default_top_k() -> usize {
    crate::engine::DEFAULT_TOP_K
}

fn default_min_distance() -> f64 {
    crate::engine::DEFAULT_MIN_DISTANCE
}

fn default_correction_cutoff() -> f64 {
    crate::engine::DEFAULT_CORRECTION_CUTOFF
}

/// Invoice matching knobs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoiceConfig {
    /// Relative unit-price tolerance for band matching
    #[serde(default = "default_price_margin")]
    pub price_margin: f64,
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            price_margin: crate::engine::DEFAULT_PRICE_MARGIN,
        }
    }
}

fn default_price_margin() -> f64 {
    crate::engine::DEFAULT_PRICE_MARGIN
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub invoices: InvoiceConfig,
}

impl Config {
    fn validate(&self) {
        if self.embedding.model.trim().is_empty() {
            panic!("embedding.model must not be empty");
        }
        if self.embedding.timeout_secs == 0 {
            panic!("embedding.timeout_secs must be greater than 0");
        }
        if self.search.top_k == 0 {
            panic!("search.top_k must be greater than 0");
        }
        if self.search.min_distance <= 0.0 {
            panic!("search.min_distance must be positive");
        }
        if !(0.0..=1.0).contains(&self.search.correction_cutoff) {
            panic!(
                "search.correction_cutoff must be between 0.0 and 1.0, got {}",
                self.search.correction_cutoff
            );
        }
        if !(0.0..1.0).contains(&self.invoices.price_margin) {
            panic!(
                "invoices.price_margin must be in [0.0, 1.0), got {}",
                self.invoices.price_margin
            );
        }
    }

    /// Load config.yaml from `base_path`, creating a default file on first
    /// run. Panics on malformed or out-of-range values; a service with a bad
    /// config should not come up at all.
    pub fn load_with(base_path: &Path) -> Self {
        let config_path = base_path.join("config.yaml");

        if !config_path.exists() {
            let defaults =
                serde_yml::to_string(&Self::default()).expect("default config serializes");
            if let Err(err) = std::fs::write(&config_path, defaults) {
                log::warn!("could not write default config.yaml: {err}");
            }
        }

        let config_str = match std::fs::read_to_string(&config_path) {
            Ok(s) => s,
            Err(err) => {
                log::warn!("could not read config.yaml ({err}), using defaults");
                return Self::default();
            }
        };

        let config: Self = serde_yml::from_str(&config_str).expect("config is malformed");
        config.validate();
        config
    }

    /// The API key, with the environment variable taking precedence over the
    /// config file so keys never have to live on disk.
    pub fn effective_api_key(&self) -> Option<String> {
        std::env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.embedding.api_key.clone())
    }
}
