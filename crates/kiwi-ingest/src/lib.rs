//! Kiwi Ingest Library
//!
//! Viral discovery pipeline: GenBank flat files go into a reference store,
//! query contigs are searched against reference databases, and the hits are
//! reconciled with the stored annotations.
//!
//! # Modules
//!
//! - **flatfile**: GenBank flat-file parser and raw-entry isolator
//! - **alignment**: 12-column tabular alignment reader
//! - **subset**: significant-query FASTA subsetter
//! - **reconcile**: hit/reference join and CSV output
//! - **store**: reference store trait and its SQLite implementation
//! - **pipeline**: upload, extract and update runs
//! - **aligner** / **search**: BLAST and usearch invocation
//!
//! # Example
//!
//! ```no_run
//! use kiwi_ingest::config::Config;
//! use kiwi_ingest::pipeline::{upload_flat_file, UploadOptions};
//! use kiwi_ingest::store::SqliteStore;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let store = SqliteStore::connect(&config.database).await?;
//!     let summary = upload_flat_file(
//!         &store,
//!         &UploadOptions {
//!             input: Path::new("viral.1.genomic.gbff"),
//!             gene_table: &config.pipeline.gene_table,
//!             skip_existing: true,
//!             log_dir: Path::new("."),
//!         },
//!     )
//!     .await?;
//!     summary.log();
//!     store.close().await;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod aligner;
pub mod alignment;
pub mod config;
pub mod flatfile;
pub mod pipeline;
pub mod reconcile;
pub mod search;
pub mod store;
pub mod subset;
pub mod summary;
pub mod worker;

pub use summary::RunSummary;
