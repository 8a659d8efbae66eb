// Upload a GenBank flat file into the reference store

use super::append_failed_log;
use crate::flatfile::{open_flat_file, FlatFileParser};
use crate::store::{ReferenceStore, ANNOTATION_TABLE};
use crate::summary::RunSummary;
use anyhow::{Context, Result};
use kiwi_common::KiwiError;
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct UploadOptions<'a> {
    pub input: &'a Path,
    pub gene_table: &'a str,
    /// Only insert records whose accession is not stored yet
    pub skip_existing: bool,
    /// Directory receiving `failedUploads.txt`
    pub log_dir: &'a Path,
}

/// Whether a store error means the store itself is unusable
fn is_store_unavailable(err: &KiwiError) -> bool {
    matches!(
        err,
        KiwiError::Database(
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Configuration(_)
        )
    )
}

/// Parse `input` and insert every usable record
///
/// Records the parser rejects and records whose insert fails are logged to
/// `failedUploads.txt` and the run continues. Losing the store aborts.
pub async fn upload_flat_file<S: ReferenceStore + ?Sized>(
    store: &S,
    options: &UploadOptions<'_>,
) -> Result<RunSummary> {
    let started = Instant::now();
    store
        .create_tables(options.gene_table)
        .await
        .context("Failed to create reference tables")?;

    let skip: HashSet<String> = if options.skip_existing {
        store
            .list_accessions(ANNOTATION_TABLE)
            .await
            .context("Failed to list stored accessions")?
            .into_iter()
            .collect()
    } else {
        HashSet::new()
    };
    info!(input = %options.input.display(), known = skip.len(), "Uploading flat file");

    let reader = open_flat_file(options.input)
        .with_context(|| format!("Failed to open {}", options.input.display()))?;
    let parser = FlatFileParser::with_skip_set(skip);
    let mut records = parser.records(reader);

    let mut summary = RunSummary::default();
    let mut failed: Vec<String> = Vec::new();

    for record in records.by_ref() {
        let record = record.with_context(|| format!("Failed to read {}", options.input.display()))?;
        summary.records_parsed += 1;

        match store.insert_record(options.gene_table, &record).await {
            Ok(()) => summary.records_stored += 1,
            Err(e) if is_store_unavailable(&e) => {
                append_failed_log(options.log_dir, &failed)?;
                return Err(e).context("Reference store became unavailable");
            },
            Err(e) => {
                warn!(accession = %record.accession, error = %e, "Failed to upload record");
                failed.push(record.accession.clone());
            },
        }

        if summary.records_parsed % 1000 == 0 {
            info!(parsed = summary.records_parsed, stored = summary.records_stored, "Upload progress");
        }
    }

    let (malformed, skipped) = records.finish();
    summary.records_skipped = skipped;
    summary.malformed_records = malformed.len();
    summary.failed_uploads = failed.len();
    failed.extend(
        malformed
            .into_iter()
            .filter(|m| m.accession != "unknown")
            .map(|m| m.accession),
    );

    append_failed_log(options.log_dir, &failed)?;

    info!(
        stored = summary.records_stored,
        skipped = summary.records_skipped,
        failed = failed.len(),
        elapsed = ?started.elapsed(),
        "Upload complete"
    );
    Ok(summary)
}
