// Incremental update from a new RefSeq release
//
// Stages run in order and a run can resume from any of them:
//   identify -> upload -> extract -> makedb

use super::extract::{extract_dna, extract_protein};
use super::upload::{upload_flat_file, UploadOptions};
use crate::aligner::{Aligners, SearchTool};
use crate::flatfile::{isolate_entries, open_flat_file, scan_accessions};
use crate::search::build_databases;
use crate::store::{ReferenceStore, ANNOTATION_TABLE};
use crate::summary::RunSummary;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Flat file holding only the entries not yet stored
pub const NEW_ENTRIES: &str = "flatFile.subset.gbff";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UpdateStage {
    Identify,
    Upload,
    Extract,
    MakeDb,
}

impl std::str::FromStr for UpdateStage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "identify" | "id" => Ok(UpdateStage::Identify),
            "upload" => Ok(UpdateStage::Upload),
            "extract" => Ok(UpdateStage::Extract),
            "makedb" => Ok(UpdateStage::MakeDb),
            _ => Err(anyhow::anyhow!("Invalid update stage: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateOptions<'a> {
    /// Downloaded release, plain or `.gz`
    pub refseq: &'a Path,
    /// Reference FASTA and aligner database directory
    pub dbdir: &'a Path,
    /// Where the new-entries subset and failed-upload log go
    pub workdir: &'a Path,
    pub gene_table: &'a str,
    pub workers: usize,
    pub resume_from: UpdateStage,
}

/// Write the records of `refseq` that are not in the store to `workdir`
async fn identify_new_entries<S: ReferenceStore + ?Sized>(store: &S, refseq: &Path, workdir: &Path) -> Result<PathBuf> {
    let known: HashSet<String> = store
        .list_accessions(ANNOTATION_TABLE)
        .await
        .context("Failed to list stored accessions")?
        .into_iter()
        .collect();

    let release = open_flat_file(refseq).with_context(|| format!("Failed to open {}", refseq.display()))?;
    let new_ids: HashSet<String> = scan_accessions(release)?
        .into_iter()
        .filter(|acc| !known.contains(acc))
        .collect();
    info!(known = known.len(), new = new_ids.len(), "Identified new entries");

    let subset = workdir.join(NEW_ENTRIES);
    let out = BufWriter::new(File::create(&subset).with_context(|| format!("Failed to create {}", subset.display()))?);
    isolate_entries(refseq, out, &new_ids)?;
    Ok(subset)
}

pub async fn run_update<S>(store: &S, aligners: &Aligners, options: &UpdateOptions<'_>) -> Result<RunSummary>
where
    S: ReferenceStore + Clone + 'static,
{
    std::fs::create_dir_all(options.workdir)?;
    std::fs::create_dir_all(options.dbdir)?;
    let subset = options.workdir.join(NEW_ENTRIES);
    let mut summary = RunSummary::default();

    if options.resume_from <= UpdateStage::Identify {
        store.create_tables(options.gene_table).await?;
        identify_new_entries(store, options.refseq, options.workdir).await?;
    }

    if options.resume_from <= UpdateStage::Upload {
        summary = upload_flat_file(
            store,
            &UploadOptions {
                input: &subset,
                gene_table: options.gene_table,
                skip_existing: true,
                log_dir: options.workdir,
            },
        )
        .await
        .context("Upload of new entries failed")?;
    }

    if options.resume_from <= UpdateStage::Extract {
        extract_dna(store, options.dbdir, options.workers).await?;
        extract_protein(store, options.gene_table, options.dbdir, options.workers).await?;
    }

    for tool in [SearchTool::Blast, SearchTool::Ublast] {
        build_databases(aligners, tool, options.dbdir).await?;
    }

    info!(dbdir = %options.dbdir.display(), "Update complete");
    Ok(summary)
}
