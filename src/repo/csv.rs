//! File-backed repository: CSV tables plus a binary vector sidecar.
//!
//! Layout inside the data directory:
//! - products.csv: id, code, description
//! - invoices.csv: invoice_number, customer_name, state, print_date
//! - items.csv: invoice_number, item_number, ean, product_description, unit_price
//! - vectors.bin: precomputed embeddings, written by the `index` command
//!
//! Every call re-reads the files it needs, so external edits are picked up
//! without restarting; there is no in-process cache at this layer (the
//! catalog snapshot above does the caching for the hot search path).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::invoices::InvoiceCriteria;
use crate::repo::vectors::VectorStore;
use crate::repo::{
    encode_vector, rank_products, EmbeddingRow, InvoiceLine, Product, RankedMatch, RepoCounts,
    RepoError, Repository,
};

#[derive(Debug, Deserialize)]
struct InvoiceHeaderRow {
    invoice_number: u64,
    customer_name: String,
    state: String,
    print_date: chrono::NaiveDate,
}

#[derive(Debug, Deserialize)]
struct ItemRow {
    invoice_number: u64,
    item_number: u32,
    ean: String,
    product_description: String,
    unit_price: f64,
}

pub struct CsvRepository {
    dir: PathBuf,
    expected_model_id: Option<[u8; 32]>,
}

impl CsvRepository {
    /// Open the repository rooted at `dir`. When `expected_model_id` is set,
    /// a vectors.bin written with a different embedding model is rejected at
    /// read time instead of mixing vector spaces.
    pub fn new(dir: impl Into<PathBuf>, expected_model_id: Option<[u8; 32]>) -> Self {
        Self {
            dir: dir.into(),
            expected_model_id,
        }
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.dir.join("vectors.bin")
    }

    fn read_csv<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, RepoError> {
        let path = self.dir.join(name);
        let mut reader = ::csv::Reader::from_path(&path)?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }

    fn read_invoice_headers(&self) -> Result<Vec<InvoiceHeaderRow>, RepoError> {
        self.read_csv("invoices.csv")
    }
}

impl Repository for CsvRepository {
    fn products(&self) -> Result<Vec<Product>, RepoError> {
        self.read_csv("products.csv")
    }

    fn embedding_rows(&self) -> Result<Vec<EmbeddingRow>, RepoError> {
        let products = self.products()?;

        let store = VectorStore::new(self.vectors_path());
        if !store.exists() {
            log::warn!(
                "{} not found, serving without vector search",
                store.path().display()
            );
            return Ok(Vec::new());
        }

        let loaded = store.load(self.expected_model_id.as_ref())?;
        log::debug!(
            "vectors.bin: {} entries, {} dimensions, model {:02x?}…",
            loaded.entries.len(),
            loaded.dimensions,
            &loaded.model_id[..4]
        );
        let by_id: HashMap<u64, Vec<f32>> = loaded.entries.into_iter().collect();

        Ok(products
            .into_iter()
            .filter_map(|product| {
                by_id.get(&product.id).map(|vector| EmbeddingRow {
                    id: product.id,
                    code: product.code,
                    description: product.description,
                    vector: encode_vector(vector),
                })
            })
            .collect())
    }

    fn find_invoice_lines(&self, criteria: &InvoiceCriteria) -> Result<Vec<InvoiceLine>, RepoError> {
        let headers: HashMap<u64, InvoiceHeaderRow> = self
            .read_invoice_headers()?
            .into_iter()
            .map(|h| (h.invoice_number, h))
            .collect();

        let items: Vec<ItemRow> = self.read_csv("items.csv")?;

        let mut lines = Vec::new();
        for item in items {
            let header = headers.get(&item.invoice_number).ok_or_else(|| {
                RepoError::Malformed(format!(
                    "item {}#{} references unknown invoice",
                    item.invoice_number, item.item_number
                ))
            })?;

            let line = InvoiceLine {
                invoice_number: item.invoice_number,
                customer_name: header.customer_name.clone(),
                state: header.state.clone(),
                print_date: header.print_date,
                item_number: item.item_number,
                ean: item.ean,
                product_description: item.product_description,
                unit_price: item.unit_price,
            };

            if criteria.matches(&line) {
                lines.push(line);
            }
        }

        Ok(lines)
    }

    fn ranked_description_search(&self, description: &str) -> Result<Vec<RankedMatch>, RepoError> {
        let products = self.products()?;
        Ok(rank_products(description, &products))
    }

    fn counts(&self) -> Result<RepoCounts, RepoError> {
        let products = self.products()?.len() as u64;
        let invoices: HashSet<u64> = self
            .read_invoice_headers()?
            .into_iter()
            .map(|h| h.invoice_number)
            .collect();
        Ok(RepoCounts {
            products,
            invoices: invoices.len() as u64,
        })
    }
}

/// Write the standard CSV files into `dir`. Used by tests and the bundled
/// sample-data generator.
pub fn write_tables(
    dir: &Path,
    products: &[Product],
    lines: &[InvoiceLine],
) -> Result<(), RepoError> {
    let mut writer = ::csv::Writer::from_path(dir.join("products.csv"))?;
    for product in products {
        writer.serialize(product)?;
    }
    writer.flush()?;

    let mut seen = HashSet::new();
    let mut writer = ::csv::Writer::from_path(dir.join("invoices.csv"))?;
    writer.write_record(["invoice_number", "customer_name", "state", "print_date"])?;
    for line in lines {
        if seen.insert(line.invoice_number) {
            writer.write_record([
                line.invoice_number.to_string(),
                line.customer_name.clone(),
                line.state.clone(),
                line.print_date.to_string(),
            ])?;
        }
    }
    writer.flush()?;

    let mut writer = ::csv::Writer::from_path(dir.join("items.csv"))?;
    writer.write_record([
        "invoice_number",
        "item_number",
        "ean",
        "product_description",
        "unit_price",
    ])?;
    for line in lines {
        writer.write_record([
            line.invoice_number.to_string(),
            line.item_number.to_string(),
            line.ean.clone(),
            line.product_description.clone(),
            line.unit_price.to_string(),
        ])?;
    }
    writer.flush()?;

    Ok(())
}
