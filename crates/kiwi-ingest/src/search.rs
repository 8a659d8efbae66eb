//! Two-stage viral search
//!
//! 1. Protein-stage search of every query against the protein reference
//! 2. Queries with a hit at or under the e-value cutoff are copied to a subset FASTA
//! 3. Nucleotide-stage search of the subset against the nucleotide reference
//!
//! A stage that fails to start or exits non-zero stops the run.

use crate::aligner::{Aligners, SearchTool};
use crate::alignment::AlignmentResultReader;
use crate::subset::write_significant_subset;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Files produced by a search run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutputs {
    pub protein_hits: PathBuf,
    pub significant_queries: PathBuf,
    pub nucleotide_hits: PathBuf,
    pub significant_count: usize,
}

#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub tool: SearchTool,
    pub query: &'a Path,
    pub dbdir: &'a Path,
    pub outdir: &'a Path,
    pub evalue_threshold: f64,
}

pub async fn run_search(aligners: &Aligners, request: &SearchRequest<'_>) -> Result<SearchOutputs> {
    std::fs::create_dir_all(request.outdir)
        .with_context(|| format!("Failed to create output directory {}", request.outdir.display()))?;

    let protein_hits = request.outdir.join(request.tool.protein_output());
    let started = Instant::now();
    aligners
        .protein_search(request.tool, request.query, request.dbdir, &protein_hits)
        .run_checked()
        .await
        .with_context(|| format!("Protein search failed on {}", request.query.display()))?;
    info!(elapsed = ?started.elapsed(), "Protein-stage search finished");

    let protein = AlignmentResultReader::with_threshold(request.evalue_threshold)
        .read_path(&protein_hits)
        .with_context(|| format!("Failed to read {}", protein_hits.display()))?;
    let significant_queries = write_significant_subset(request.query, &protein.hits, request.outdir)
        .context("Failed to write significant query subset")?;

    let nucleotide_hits = request.outdir.join(request.tool.nucleotide_output());
    let started = Instant::now();
    aligners
        .nucleotide_search(request.tool, &significant_queries, request.dbdir, &nucleotide_hits)
        .run_checked()
        .await
        .with_context(|| format!("Nucleotide search failed on {}", significant_queries.display()))?;
    info!(elapsed = ?started.elapsed(), "Nucleotide-stage search finished");

    Ok(SearchOutputs {
        protein_hits,
        significant_queries,
        nucleotide_hits,
        significant_count: protein.hits.len(),
    })
}

/// Build both reference databases for `tool` in `dbdir`
pub async fn build_databases(aligners: &Aligners, tool: SearchTool, dbdir: &Path) -> Result<()> {
    for command in aligners.database_builds(tool, dbdir) {
        command
            .run_checked()
            .await
            .with_context(|| format!("Failed to build database with '{}'", command))?;
    }
    info!(dbdir = %dbdir.display(), ?tool, "Reference databases built");
    Ok(())
}
