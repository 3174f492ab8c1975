//! Seeded in-memory repository, used by tests and offline runs.

use std::collections::HashSet;

use crate::engine::invoices::InvoiceCriteria;
use crate::repo::{
    encode_vector, rank_products, EmbeddingRow, InvoiceLine, Product, RankedMatch, RepoCounts,
    RepoError, Repository,
};

/// In-memory store over plain vectors. Built with the `with_*` methods;
/// shares the exact `Repository` semantics of the CSV store, including the
/// id join between products and embeddings.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    products: Vec<Product>,
    embeddings: Vec<(u64, Vec<f32>)>,
    lines: Vec<InvoiceLine>,
}

impl MemoryRepository {
    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }

    pub fn with_embeddings(mut self, embeddings: Vec<(u64, Vec<f32>)>) -> Self {
        self.embeddings = embeddings;
        self
    }

    pub fn with_lines(mut self, lines: Vec<InvoiceLine>) -> Self {
        self.lines = lines;
        self
    }
}

impl Repository for MemoryRepository {
    fn products(&self) -> Result<Vec<Product>, RepoError> {
        Ok(self.products.clone())
    }

    fn embedding_rows(&self) -> Result<Vec<EmbeddingRow>, RepoError> {
        let rows = self
            .products
            .iter()
            .filter_map(|product| {
                self.embeddings
                    .iter()
                    .find(|(id, _)| *id == product.id)
                    .map(|(_, vector)| EmbeddingRow {
                        id: product.id,
                        code: product.code.clone(),
                        description: product.description.clone(),
                        vector: encode_vector(vector),
                    })
            })
            .collect();
        Ok(rows)
    }

    fn find_invoice_lines(&self, criteria: &InvoiceCriteria) -> Result<Vec<InvoiceLine>, RepoError> {
        Ok(self
            .lines
            .iter()
            .filter(|line| criteria.matches(line))
            .cloned()
            .collect())
    }

    fn ranked_description_search(&self, description: &str) -> Result<Vec<RankedMatch>, RepoError> {
        Ok(rank_products(description, &self.products))
    }

    fn counts(&self) -> Result<RepoCounts, RepoError> {
        let invoices: HashSet<u64> = self.lines.iter().map(|l| l.invoice_number).collect();
        Ok(RepoCounts {
            products: self.products.len() as u64,
            invoices: invoices.len() as u64,
        })
    }
}
