use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;

mod cli;
mod config;
mod embed;
mod engine;
mod repo;
#[cfg(test)]
mod tests;

use config::Config;
use embed::HttpEmbedder;
use engine::{EngineContext, EngineError, InvoiceCriteria, SearchOptions};
use repo::{model_id, CsvRepository, VectorStore};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    let config = Config::load_with(&args.data_dir);

    if let cli::Command::Seed {} = args.command {
        let (products, lines) = repo::sample_dataset();
        repo::csv::write_tables(&args.data_dir, &products, &lines)?;
        println!(
            "wrote {} products and {} invoice lines to {}",
            products.len(),
            lines.len(),
            args.data_dir.display()
        );
        return Ok(());
    }

    let expected_model = model_id(&config.embedding.model);
    let repo = Arc::new(CsvRepository::new(&args.data_dir, Some(expected_model)));
    let embedder = Arc::new(
        HttpEmbedder::new(&config.embedding, config.effective_api_key())
            .context("building the embedding client")?,
    );

    let options = SearchOptions {
        top_k: config.search.top_k,
        min_distance: config.search.min_distance,
        correction_cutoff: config.search.correction_cutoff,
    };

    match args.command {
        cli::Command::Status {} => {
            let ctx = EngineContext::new(repo, embedder, options);
            print_json(&ctx.get_system_status())
        }

        cli::Command::Search {
            description,
            top_k,
            min_distance,
        } => {
            let ctx = EngineContext::new(repo, embedder, options);
            let result = if top_k.is_none() && min_distance.is_none() {
                ctx.search_vectorized_product(&description)
            } else {
                let overrides = SearchOptions {
                    top_k: top_k.unwrap_or(options.top_k),
                    min_distance: min_distance.unwrap_or(options.min_distance),
                    ..options
                };
                ctx.search_vectorized_product_with(&description, &overrides)
            };
            print_json(&result)
        }

        cli::Command::ResolveEan { description } => {
            let ctx = EngineContext::new(repo, embedder, options);
            match ctx.resolve_ean(&description) {
                Ok(best) => print_json(&best),
                Err(EngineError::NotFound) => {
                    println!("{}", serde_json::json!({ "match": null }));
                    Ok(())
                }
                Err(err) => Err(err.into()),
            }
        }

        cli::Command::Invoices {
            customer,
            state,
            ean,
            price,
            margin,
        } => {
            let ctx = EngineContext::new(repo, embedder, options);
            let criteria = InvoiceCriteria {
                customer,
                state,
                ean,
                price,
                margin: margin.unwrap_or(config.invoices.price_margin),
            };
            print_json(&ctx.search_invoices(&criteria))
        }

        cli::Command::Index {} => {
            let store = VectorStore::new(repo.vectors_path());
            let ctx = EngineContext::new(repo, embedder, options);

            let mut entries: Vec<(u64, Vec<f32>)> = Vec::new();
            let count = ctx
                .build_index(|id, vector| {
                    entries.push((id, vector));
                    Ok(())
                })
                .context("indexing failed")?;

            let dimensions = entries.first().map(|(_, v)| v.len()).unwrap_or(0);
            store.save(&expected_model, dimensions, &entries)?;
            println!("indexed {count} products ({dimensions} dimensions)");
            Ok(())
        }

        cli::Command::Seed {} => unreachable!("handled above"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
