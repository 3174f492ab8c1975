use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding the CSV tables, vectors.bin and config.yaml
    #[clap(short, long, default_value = ".")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report store health and row counts
    Status {},

    /// Resolve a product description through semantic search
    /// (with typo correction and fuzzy fallback)
    Search {
        /// Free-text product description
        description: String,

        /// Number of candidates to return
        #[clap(short = 'k', long)]
        top_k: Option<usize>,

        /// Euclidean distance cutoff
        #[clap(long)]
        min_distance: Option<f64>,
    },

    /// Resolve the most likely EAN for a description
    ResolveEan {
        /// Free-text product description
        description: String,
    },

    /// Search invoice line items by optional criteria
    Invoices {
        /// Customer name (case-insensitive substring)
        #[clap(short, long)]
        customer: Option<String>,

        /// Two-letter state code (exact, case-insensitive)
        #[clap(short, long)]
        state: Option<String>,

        /// Product EAN (exact)
        #[clap(short, long)]
        ean: Option<String>,

        /// Unit price, matched within +/- margin
        #[clap(short, long)]
        price: Option<f64>,

        /// Relative price tolerance
        #[clap(short, long)]
        margin: Option<f64>,
    },

    /// Embed every catalog product and write vectors.bin
    Index {},

    /// Write a small sample dataset into the data directory
    Seed {},
}
