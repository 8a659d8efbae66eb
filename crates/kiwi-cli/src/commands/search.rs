//! `kiwi search` command implementation

use super::{open_store, report};
use anyhow::Result;
use kiwi_ingest::aligner::{Aligners, SearchTool};
use kiwi_ingest::config::Config;
use kiwi_ingest::reconcile::{reconcile_run, ReconcileInputs};
use kiwi_ingest::search::{run_search, SearchRequest};
use std::path::Path;

pub async fn run(
    config: &Config,
    query: &Path,
    dbdir: &Path,
    outdir: &Path,
    tool: SearchTool,
    reconcile: bool,
    json: bool,
) -> Result<()> {
    let aligners = Aligners::new(&config.aligner);
    let outputs = run_search(
        &aligners,
        &SearchRequest {
            tool,
            query,
            dbdir,
            outdir,
            evalue_threshold: config.pipeline.evalue_threshold,
        },
    )
    .await?;

    println!("Search finished: {} significant queries", outputs.significant_count);
    println!("  Protein hits:    {}", outputs.protein_hits.display());
    println!("  Nucleotide hits: {}", outputs.nucleotide_hits.display());

    if !reconcile {
        return Ok(());
    }

    let store = open_store(config).await?;
    let result = reconcile_run(
        &store,
        &config.pipeline.gene_table,
        &ReconcileInputs {
            protein_hits: outputs.protein_hits,
            nucleotide_hits: outputs.nucleotide_hits,
            evalue_threshold: config.pipeline.evalue_threshold,
        },
        outdir,
    )
    .await;
    store.close().await;

    report(&format!("Reconciled hits into {}", outdir.display()), &result?, json)
}
