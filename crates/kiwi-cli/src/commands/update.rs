//! `kiwi update` command implementation

use super::{open_store, report};
use anyhow::Result;
use kiwi_ingest::aligner::Aligners;
use kiwi_ingest::config::Config;
use kiwi_ingest::pipeline::{run_update, UpdateOptions, UpdateStage};
use std::path::Path;

pub async fn run(
    config: &Config,
    refseq: &Path,
    dbdir: &Path,
    workdir: &Path,
    from: UpdateStage,
    json: bool,
) -> Result<()> {
    let store = open_store(config).await?;
    let aligners = Aligners::new(&config.aligner);
    let result = run_update(
        &store,
        &aligners,
        &UpdateOptions {
            refseq,
            dbdir,
            workdir,
            gene_table: &config.pipeline.gene_table,
            workers: config.pipeline.workers,
            resume_from: from,
        },
    )
    .await;
    store.close().await;

    report(&format!("Updated reference databases in {}", dbdir.display()), &result?, json)
}
