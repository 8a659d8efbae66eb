//! `kiwi extract` command implementation

use super::open_store;
use crate::ExtractTarget;
use anyhow::Result;
use kiwi_ingest::config::Config;
use kiwi_ingest::pipeline::{extract_csv, extract_dna, extract_protein};
use kiwi_ingest::store::ANNOTATION_TABLE;
use std::path::Path;

pub async fn run(config: &Config, what: ExtractTarget, outdir: &Path, table: Option<&str>) -> Result<()> {
    let store = open_store(config).await?;
    let workers = config.pipeline.workers;

    let result = match what {
        ExtractTarget::Csv => extract_csv(&store, table.unwrap_or(ANNOTATION_TABLE), outdir, workers).await,
        ExtractTarget::Dna => extract_dna(&store, outdir, workers).await,
        ExtractTarget::Protein => extract_protein(&store, &config.pipeline.gene_table, outdir, workers).await,
    };
    store.close().await;

    println!("Wrote {}", result?.display());
    Ok(())
}
