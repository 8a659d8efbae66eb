// Result reconciliation
//
// Joins nucleotide-stage hits, protein-stage hits and stored reference rows
// into coverage-annotated CSV rows.

pub mod models;
pub mod reconciler;
pub mod writer;

pub use models::{ReconciledResult, Reconciliation, ReferenceSnapshot};
pub use reconciler::{coverage, subsequence, ResultReconciler};
pub use writer::{write_results, write_results_file, NUCLEOTIDE_RESULTS, PROTEIN_RESULTS};

use crate::alignment::{AlignmentResultReader, HitMap};
use crate::store::{strip_version, ReferenceStore};
use crate::summary::RunSummary;
use anyhow::Context;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Fetch every stored row the hit maps can refer to
pub async fn prefetch<S: ReferenceStore + ?Sized>(
    store: &S,
    gene_table: &str,
    nucleotide: &HitMap,
    protein: &HitMap,
) -> kiwi_common::Result<ReferenceSnapshot> {
    let accessions: Vec<String> = nucleotide
        .values()
        .flat_map(|hit| {
            let accession = hit.hit.accession.as_str();
            std::iter::once(accession).chain(strip_version(accession))
        })
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let protein_ids: Vec<String> = protein
        .values()
        .filter_map(|hit| hit.hit.protein_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let annotations = store.fetch_annotations(&accessions).await?;
    let genes = store.fetch_genes(gene_table, &protein_ids).await?;
    Ok(ReferenceSnapshot::new(annotations, genes))
}

/// Aligner output files of one search run
#[derive(Debug, Clone)]
pub struct ReconcileInputs {
    pub protein_hits: PathBuf,
    pub nucleotide_hits: PathBuf,
    pub evalue_threshold: f64,
}

/// Read both hit files, reconcile against the store and write both CSVs
pub async fn reconcile_run<S: ReferenceStore + ?Sized>(
    store: &S,
    gene_table: &str,
    inputs: &ReconcileInputs,
    outdir: &Path,
) -> anyhow::Result<RunSummary> {
    let mut summary = RunSummary::default();

    let protein = AlignmentResultReader::with_threshold(inputs.evalue_threshold)
        .read_path(&inputs.protein_hits)
        .with_context(|| format!("Failed to read {}", inputs.protein_hits.display()))?;
    let nucleotide = AlignmentResultReader::new()
        .read_path(&inputs.nucleotide_hits)
        .with_context(|| format!("Failed to read {}", inputs.nucleotide_hits.display()))?;

    for stats in [&protein.stats, &nucleotide.stats] {
        summary.malformed_alignment_lines += stats.malformed;
        summary.duplicate_alignment_lines += stats.duplicates;
    }

    let snapshot = prefetch(store, gene_table, &nucleotide.hits, &protein.hits)
        .await
        .context("Failed to load reference rows")?;
    info!(
        annotations = snapshot.annotation_count(),
        genes = snapshot.gene_count(),
        "Loaded reference snapshot"
    );

    let result = ResultReconciler::new(&snapshot).reconcile(&nucleotide.hits, &protein.hits, &mut summary);

    std::fs::create_dir_all(outdir)
        .with_context(|| format!("Failed to create {}", outdir.display()))?;
    for (name, rows) in [
        (NUCLEOTIDE_RESULTS, &result.nucleotide),
        (PROTEIN_RESULTS, &result.protein),
    ] {
        let path = outdir.join(name);
        summary.rows_written += write_results_file(&path, rows)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), rows = rows.len(), "Wrote results");
    }

    Ok(summary)
}
