//! Repository boundary for the catalog and invoice stores.
//!
//! The engine never talks to a database directly; everything goes through the
//! [`Repository`] trait. Two implementations ship with the binary:
//!
//! - `CsvRepository`: file-backed store (products.csv, invoices.csv, items.csv
//!   plus vectors.bin for embedding blobs)
//! - `MemoryRepository`: seeded in-memory store for tests and offline runs

pub mod csv;
pub mod memory;
pub mod ranked;
pub mod vectors;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::invoices::InvoiceCriteria;

pub use csv::CsvRepository;
pub use memory::MemoryRepository;
pub use ranked::rank_products;
pub use vectors::{model_id, VectorStore, VectorStoreError};

/// A catalog product. Immutable for the lifetime of a loaded snapshot;
/// `id` uniquely determines `code` and `description`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    /// String identifier, typically an EAN barcode.
    pub code: String,
    pub description: String,
}

/// One row of the embeddings store: a product plus its raw vector blob.
///
/// The blob is the persisted little-endian f32 byte sequence, carried
/// unmodified; decoding happens at catalog load.
#[derive(Debug, Clone)]
pub struct EmbeddingRow {
    pub id: u64,
    pub code: String,
    pub description: String,
    pub vector: Vec<u8>,
}

/// A single line item of an outbound invoice, joined with its invoice header.
/// Sourced read-only; the engine never mutates invoice data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub invoice_number: u64,
    pub customer_name: String,
    pub state: String,
    pub print_date: NaiveDate,
    pub item_number: u32,
    pub ean: String,
    pub product_description: String,
    pub unit_price: f64,
}

/// A row from the ranked description search, pre-sorted by similarity
/// descending on the repository side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMatch {
    pub code: String,
    pub description: String,
    pub similarity: f64,
}

/// Row counts reported by `get_system_status`.
#[derive(Debug, Clone, Copy)]
pub struct RepoCounts {
    pub products: u64,
    pub invoices: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("vector store: {0}")]
    Vectors(#[from] VectorStoreError),

    #[error("malformed row: {0}")]
    Malformed(String),
}

/// Relational access to `products`, `embeddings` and invoice line items.
///
/// All methods are point-in-time reads; implementations must be safe to call
/// from parallel requests. Failures map to `RepositoryUnavailable` at the
/// engine boundary and degrade rather than abort the pipeline.
pub trait Repository: Send + Sync {
    /// All catalog products, in repository order.
    fn products(&self) -> Result<Vec<Product>, RepoError>;

    /// All products that have a stored embedding blob, in repository order.
    fn embedding_rows(&self) -> Result<Vec<EmbeddingRow>, RepoError>;

    /// Invoice lines matching the given criteria (conjunctive filters; an
    /// absent criterion does not restrict the result).
    fn find_invoice_lines(&self, criteria: &InvoiceCriteria) -> Result<Vec<InvoiceLine>, RepoError>;

    /// Ranked lexical/phonetic search over known code/description pairs.
    /// Rows come back sorted by similarity descending; zero rows is an
    /// expected outcome, not an error.
    fn ranked_description_search(&self, description: &str) -> Result<Vec<RankedMatch>, RepoError>;

    /// Product and invoice row counts.
    fn counts(&self) -> Result<RepoCounts, RepoError>;
}

/// A small demo dataset for first runs; written by the `seed` command.
pub fn sample_dataset() -> (Vec<Product>, Vec<InvoiceLine>) {
    let products = vec![
        Product {
            id: 1,
            code: "7890000000011".into(),
            description: "Harry Potter Book".into(),
        },
        Product {
            id: 2,
            code: "7890000000028".into(),
            description: "Lord of the Rings Trilogy".into(),
        },
        Product {
            id: 3,
            code: "7890000000035".into(),
            description: "Cooking for Beginners".into(),
        },
    ];

    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
    let lines = vec![
        InvoiceLine {
            invoice_number: 1001,
            customer_name: "Acme Books".into(),
            state: "SP".into(),
            print_date: date(2024, 2, 20),
            item_number: 1,
            ean: "7890000000011".into(),
            product_description: "Harry Potter Book".into(),
            unit_price: 49.9,
        },
        InvoiceLine {
            invoice_number: 1001,
            customer_name: "Acme Books".into(),
            state: "SP".into(),
            print_date: date(2024, 2, 20),
            item_number: 2,
            ean: "7890000000028".into(),
            product_description: "Lord of the Rings Trilogy".into(),
            unit_price: 129.0,
        },
        InvoiceLine {
            invoice_number: 1002,
            customer_name: "Beta Livraria".into(),
            state: "RJ".into(),
            print_date: date(2024, 3, 5),
            item_number: 1,
            ean: "7890000000011".into(),
            product_description: "Harry Potter Book".into(),
            unit_price: 52.0,
        },
        InvoiceLine {
            invoice_number: 1003,
            customer_name: "Beta Livraria".into(),
            state: "RJ".into(),
            print_date: date(2024, 4, 12),
            item_number: 1,
            ean: "7890000000035".into(),
            product_description: "Cooking for Beginners".into(),
            unit_price: 35.5,
        },
    ];

    (products, lines)
}

/// Encode a vector as the persisted little-endian f32 blob format.
/// This is the only bit-exact format the engine must preserve.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}
