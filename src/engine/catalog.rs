//! In-memory catalog snapshot with precomputed embedding vectors.
//!
//! The snapshot pairs every product with its embedding vector and is loaded
//! atomically at engine startup. It is immutable after load; replacing it is
//! the engine context's job (whole-`Arc` swap), so concurrent readers never
//! observe a partially-updated catalog.

use crate::engine::error::EngineError;
use crate::repo::{Product, Repository};

/// All products with their embedding vectors, in repository order.
///
/// Invariant: `products.len() == vectors.len()` and every vector has
/// `dimensions` elements. Rows whose blob cannot be decoded or whose length
/// disagrees with the first row are skipped at load time.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    products: Vec<Product>,
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
}

impl CatalogSnapshot {
    /// An empty snapshot. `nearest` over it returns no matches, which callers
    /// treat as "no vector signal" and degrade to fuzzy matching.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the snapshot from the repository's embedding rows.
    ///
    /// Fails only when the repository itself is unreachable; zero usable rows
    /// yields an empty (valid) snapshot so the engine can serve fuzzy-only.
    pub fn load(repo: &dyn Repository) -> Result<Self, EngineError> {
        let rows = repo.embedding_rows()?;

        let mut products = Vec::with_capacity(rows.len());
        let mut vectors = Vec::with_capacity(rows.len());
        let mut dimensions = 0usize;
        let mut skipped = 0usize;

        for row in rows {
            let Some(vector) = decode_vector(&row.vector) else {
                skipped += 1;
                continue;
            };
            if dimensions == 0 {
                dimensions = vector.len();
            } else if vector.len() != dimensions {
                log::warn!(
                    "skipping product {}: vector length {} != {}",
                    row.id,
                    vector.len(),
                    dimensions
                );
                skipped += 1;
                continue;
            }
            products.push(Product {
                id: row.id,
                code: row.code,
                description: row.description,
            });
            vectors.push(vector);
        }

        if skipped > 0 {
            log::warn!("catalog load skipped {skipped} rows without usable vectors");
        }
        log::info!("loaded {} products with vectors", products.len());

        Ok(Self {
            products,
            vectors,
            dimensions,
        })
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Embedding vector length shared by every entry; 0 when empty.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// The known description vocabulary, in catalog order.
    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.products.iter().map(|p| p.description.as_str())
    }

    /// Nearest catalog entries to `query` by Euclidean distance.
    ///
    /// Returns `(catalog index, distance)` pairs ascending by distance, ties
    /// broken by catalog insertion order, truncated to `k`; entries with
    /// distance >= `max_distance` are excluded. An empty snapshot or a query
    /// of the wrong length yields an empty result, never an error.
    pub fn nearest(&self, query: &[f32], k: usize, max_distance: f64) -> Vec<(usize, f64)> {
        if self.is_empty() || k == 0 {
            return Vec::new();
        }
        if query.len() != self.dimensions {
            log::warn!(
                "query vector length {} != catalog dimensions {}; no vector signal",
                query.len(),
                self.dimensions
            );
            return Vec::new();
        }

        let mut distances: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, vector)| (idx, euclidean(query, vector)))
            .filter(|(_, d)| *d < max_distance)
            .collect();

        distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        distances.truncate(k);
        distances
    }
}

fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x - *y) as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Decode a persisted little-endian f32 blob. Returns `None` for an empty
/// blob or one whose length is not a multiple of four bytes.
pub fn decode_vector(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.is_empty() || blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
