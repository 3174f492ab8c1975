//! Engine context: the long-lived handle every entry point goes through.
//!
//! Holds the repository, the embedding provider and the current catalog
//! snapshot. The snapshot lives behind `RwLock<Arc<...>>`: readers clone the
//! `Arc` and release the lock immediately, reloads build the replacement
//! off-lock and swap it in one write. In-flight searches keep serving the
//! snapshot they started with.

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::embed::EmbedTextProvider;
use crate::engine::catalog::CatalogSnapshot;
use crate::engine::error::EngineError;
use crate::engine::ean;
use crate::engine::invoices::{self, InvoiceCriteria, MatchCandidate};
use crate::engine::search::{self, SearchOptions, SearchResult};
use crate::repo::{RankedMatch, Repository};

/// Operational health report. `error` carries the repository failure text
/// when `status` is "offline"; counts are zero in that case.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub status: &'static str,
    pub products: u64,
    pub invoices: u64,
    pub catalog_vectors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Invoice search outcome. Repository failures surface here as a structured
/// error alongside an empty candidate list; they never panic the caller.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSearchOutcome {
    pub candidates: Vec<MatchCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct EngineContext {
    repo: Arc<dyn Repository>,
    embedder: Arc<dyn EmbedTextProvider>,
    options: SearchOptions,
    snapshot: RwLock<Arc<CatalogSnapshot>>,
}

impl EngineContext {
    /// Build the context and load the initial catalog snapshot.
    ///
    /// A failing catalog load is tolerated: the engine starts with an empty
    /// snapshot and serves fuzzy-only until a successful `reload_catalog`.
    pub fn new(
        repo: Arc<dyn Repository>,
        embedder: Arc<dyn EmbedTextProvider>,
        options: SearchOptions,
    ) -> Self {
        let snapshot = match CatalogSnapshot::load(repo.as_ref()) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::warn!("initial catalog load failed, starting empty: {err}");
                CatalogSnapshot::empty()
            }
        };

        Self {
            repo,
            embedder,
            options,
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot current at the time of the call.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Rebuild the catalog snapshot from the repository and swap it in.
    /// The old snapshot stays valid for searches already running against it.
    pub fn reload_catalog(&self) -> Result<usize, EngineError> {
        let fresh = CatalogSnapshot::load(self.repo.as_ref())?;
        let count = fresh.len();
        let dims = fresh.dimensions();
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(fresh);
        log::info!("catalog reloaded: {count} products, {dims} dimensions");
        Ok(count)
    }

    /// Typo-correct, embed and rank a product description. Infallible:
    /// provider and vector failures degrade to the fuzzy path inside.
    pub fn search_vectorized_product(&self, description: &str) -> SearchResult {
        let snapshot = self.snapshot();
        search::search_products(&snapshot, self.embedder.as_ref(), &self.options, description)
    }

    /// Variant with per-call overrides of the ranking knobs.
    pub fn search_vectorized_product_with(
        &self,
        description: &str,
        options: &SearchOptions,
    ) -> SearchResult {
        let snapshot = self.snapshot();
        search::search_products(&snapshot, self.embedder.as_ref(), options, description)
    }

    /// Resolve the most likely EAN for a description via the ranked search.
    pub fn resolve_ean(&self, description: &str) -> Result<RankedMatch, EngineError> {
        ean::resolve(self.repo.as_ref(), description)
    }

    /// Retrieve and score invoice lines against the criteria. Repository
    /// failure yields an empty outcome with the error attached.
    pub fn search_invoices(&self, criteria: &InvoiceCriteria) -> InvoiceSearchOutcome {
        match self.repo.find_invoice_lines(criteria) {
            Ok(lines) => InvoiceSearchOutcome {
                candidates: invoices::score_candidates(criteria, lines),
                error: None,
            },
            Err(err) => {
                log::error!("invoice retrieval failed: {err}");
                InvoiceSearchOutcome {
                    candidates: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Health probe: row counts plus the loaded vector count. Never fails;
    /// a broken repository is reported as an offline status.
    pub fn get_system_status(&self) -> SystemStatus {
        let catalog_vectors = self.snapshot().len();
        match self.repo.counts() {
            Ok(counts) => SystemStatus {
                status: "online",
                products: counts.products,
                invoices: counts.invoices,
                catalog_vectors,
                error: None,
            },
            Err(err) => {
                log::error!("status probe failed: {err}");
                SystemStatus {
                    status: "offline",
                    products: 0,
                    invoices: 0,
                    catalog_vectors,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Embed every catalog product and persist the result through `persist`.
    /// Used by the offline indexing command; reports per-product progress at
    /// debug level and returns the number of vectors produced.
    pub fn build_index<F>(&self, mut persist: F) -> Result<usize, EngineError>
    where
        F: FnMut(u64, Vec<f32>) -> Result<(), EngineError>,
    {
        let products = self.repo.products()?;
        let total = products.len();

        for (i, product) in products.iter().enumerate() {
            let vector = self
                .embedder
                .embed(&product.description, crate::embed::EmbedMode::Document)?;
            log::debug!(
                "indexed {}/{total} ({}, {} dims)",
                i + 1,
                product.code,
                vector.len()
            );
            persist(product.id, vector)?;
        }

        Ok(total)
    }
}
