//! `kiwi upload` command implementation

use super::{open_store, report};
use anyhow::Result;
use kiwi_ingest::config::Config;
use kiwi_ingest::pipeline::{upload_flat_file, UploadOptions};
use std::path::Path;

pub async fn run(config: &Config, input: &Path, all: bool, log_dir: &Path, json: bool) -> Result<()> {
    let store = open_store(config).await?;
    let result = upload_flat_file(
        &store,
        &UploadOptions {
            input,
            gene_table: &config.pipeline.gene_table,
            skip_existing: !all,
            log_dir,
        },
    )
    .await;
    store.close().await;

    report(&format!("Uploaded {}", input.display()), &result?, json)
}
