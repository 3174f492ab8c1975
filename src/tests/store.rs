//! Integration tests over the file-backed store: CSV tables plus vectors.bin.

use std::sync::Arc;

use tempfile::tempdir;

use crate::engine::{EngineContext, SearchOptions};
use crate::repo::csv::write_tables;
use crate::repo::{model_id, sample_dataset, CsvRepository, Repository, VectorStore};
use crate::tests::{OfflineEmbedder, TableEmbedder};

const MODEL: &str = "gemini-embedding-001";

fn seeded_embedder() -> TableEmbedder {
    TableEmbedder {
        entries: vec![
            ("Harry Potter Book", vec![1.0, 0.0]),
            ("Lord of the Rings Trilogy", vec![0.0, 1.0]),
            ("Cooking for Beginners", vec![-1.0, 0.0]),
        ],
        fallback: vec![10.0, 10.0],
    }
}

#[test]
fn index_then_search_over_the_csv_store() {
    let dir = tempdir().unwrap();
    let (products, lines) = sample_dataset();
    write_tables(dir.path(), &products, &lines).unwrap();

    let id = model_id(MODEL);
    let repo = Arc::new(CsvRepository::new(dir.path(), Some(id)));
    let store = VectorStore::new(repo.vectors_path());

    // Build the index through the same path the `index` command uses.
    let ctx = EngineContext::new(
        repo.clone(),
        Arc::new(seeded_embedder()),
        SearchOptions::default(),
    );
    let mut entries = Vec::new();
    let count = ctx
        .build_index(|product_id, vector| {
            entries.push((product_id, vector));
            Ok(())
        })
        .unwrap();
    assert_eq!(count, 3);
    store.save(&id, 2, &entries).unwrap();

    // The context started before vectors.bin existed; reload picks it up.
    assert!(ctx.snapshot().is_empty());
    assert_eq!(ctx.reload_catalog().unwrap(), 3);

    let result = ctx.search_vectorized_product("harry poter");
    assert_eq!(result.query_normalized, "Harry Potter Book");
    assert_eq!(result.semantic_matches[0].code, "7890000000011");
    assert_eq!(result.semantic_matches[0].similarity, 100.0);
}

#[test]
fn model_mismatch_keeps_the_engine_serving_fuzzy() {
    let dir = tempdir().unwrap();
    let (products, lines) = sample_dataset();
    write_tables(dir.path(), &products, &lines).unwrap();

    // vectors.bin written with a different model than the repo expects.
    let store = VectorStore::new(dir.path().join("vectors.bin"));
    store
        .save(&model_id("some-older-model"), 2, &[(1, vec![1.0, 0.0])])
        .unwrap();

    let repo = Arc::new(CsvRepository::new(dir.path(), Some(model_id(MODEL))));
    assert!(repo.embedding_rows().is_err());

    // Startup tolerates the bad file and serves the lexical paths.
    let ctx = EngineContext::new(repo, Arc::new(OfflineEmbedder), SearchOptions::default());
    assert!(ctx.snapshot().is_empty());

    let best = ctx.resolve_ean("harry potter book").unwrap();
    assert_eq!(best.code, "7890000000011");
}

#[test]
fn invoice_search_reads_joined_csv_rows() {
    let dir = tempdir().unwrap();
    let (products, lines) = sample_dataset();
    write_tables(dir.path(), &products, &lines).unwrap();

    let repo = Arc::new(CsvRepository::new(dir.path(), None));
    let ctx = EngineContext::new(repo, Arc::new(OfflineEmbedder), SearchOptions::default());

    let criteria = crate::engine::InvoiceCriteria {
        customer: Some("beta".into()),
        state: Some("rj".into()),
        ..Default::default()
    };
    let outcome = ctx.search_invoices(&criteria);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.candidates.len(), 2);
    assert!(outcome
        .candidates
        .iter()
        .all(|c| c.line.customer_name == "Beta Livraria"));

    let status = ctx.get_system_status();
    assert_eq!(status.status, "online");
    assert_eq!(status.products, 3);
    assert_eq!(status.invoices, 3);
}
