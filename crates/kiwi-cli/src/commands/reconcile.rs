//! `kiwi reconcile` command implementation

use super::{open_store, report};
use anyhow::Result;
use kiwi_ingest::config::Config;
use kiwi_ingest::reconcile::{reconcile_run, ReconcileInputs};
use std::path::Path;

pub async fn run(
    config: &Config,
    protein_hits: &Path,
    nucleotide_hits: &Path,
    outdir: &Path,
    json: bool,
) -> Result<()> {
    let store = open_store(config).await?;
    let result = reconcile_run(
        &store,
        &config.pipeline.gene_table,
        &ReconcileInputs {
            protein_hits: protein_hits.to_path_buf(),
            nucleotide_hits: nucleotide_hits.to_path_buf(),
            evalue_threshold: config.pipeline.evalue_threshold,
        },
        outdir,
    )
    .await;
    store.close().await;

    report(&format!("Reconciled hits into {}", outdir.display()), &result?, json)
}
