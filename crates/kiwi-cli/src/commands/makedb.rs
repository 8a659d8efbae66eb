//! `kiwi makedb` command implementation

use anyhow::Result;
use kiwi_ingest::aligner::{Aligners, SearchTool};
use kiwi_ingest::config::Config;
use kiwi_ingest::search::build_databases;
use std::path::Path;

pub async fn run(config: &Config, dbdir: &Path, tool: SearchTool) -> Result<()> {
    let aligners = Aligners::new(&config.aligner);
    build_databases(&aligners, tool, dbdir).await?;
    println!("Built {:?} databases in {}", tool, dbdir.display());
    Ok(())
}
