//! `kiwi backup` command implementation

use super::open_store;
use anyhow::{Context, Result};
use kiwi_ingest::config::Config;
use std::path::Path;

pub async fn run(config: &Config, dir: &Path) -> Result<()> {
    let store = open_store(config).await?;
    let result = store.backup(dir).await;
    store.close().await;

    let path = result.with_context(|| format!("Failed to back up {}", config.database.url))?;
    println!("Backed up reference store to {}", path.display());
    Ok(())
}
