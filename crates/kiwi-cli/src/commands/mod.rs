//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function. Commands that
//! touch the reference store open it from the loaded [`Config`] and close it
//! before returning.

pub mod backup;
pub mod extract;
pub mod isolate;
pub mod makedb;
pub mod reconcile;
pub mod search;
pub mod update;
pub mod upload;

use anyhow::{Context, Result};
use kiwi_ingest::config::Config;
use kiwi_ingest::store::SqliteStore;
use kiwi_ingest::RunSummary;

/// Open the reference store named by `config`
pub async fn open_store(config: &Config) -> Result<SqliteStore> {
    let store = SqliteStore::connect(&config.database)
        .await
        .with_context(|| format!("Failed to open reference store at {}", config.database.url))?;
    Ok(store.with_batch_size(config.pipeline.batch_size))
}

/// Print the end-of-run summary, the one thing commands write to stdout
pub fn report(title: &str, summary: &RunSummary, json: bool) -> Result<()> {
    summary.log();
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!("{}", title);
        print!("{}", summary);
        if !summary.is_clean() {
            println!("  Some inputs were skipped or incomplete; see the log for details");
        }
    }
    Ok(())
}
