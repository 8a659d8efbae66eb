// Join of alignment hits with stored reference rows

use super::models::{ReconciledResult, Reconciliation, ReferenceSnapshot};
use crate::alignment::{AlignmentHit, HitMap};
use crate::summary::RunSummary;
use tracing::{debug, warn};

/// Builds output rows from the two hit maps and a reference snapshot
///
/// Pure and synchronous; all store access happens while building the
/// snapshot.
pub struct ResultReconciler<'a> {
    snapshot: &'a ReferenceSnapshot,
}

impl<'a> ResultReconciler<'a> {
    pub fn new(snapshot: &'a ReferenceSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn reconcile(&self, nucleotide: &HitMap, protein: &HitMap, summary: &mut RunSummary) -> Reconciliation {
        let mut out = Reconciliation::default();

        for (query, nucleotide_hit) in nucleotide {
            let protein_hit = protein.get(query);
            let row = self.assemble(query, nucleotide_hit, protein_hit, summary);

            if let Some(hit) = protein_hit {
                let gene_length = row
                    .protein_id
                    .as_deref()
                    .and_then(|pid| self.snapshot.gene(pid))
                    .map(|gene| gene.protein_length);
                let mut protein_row = row.clone();
                protein_row.coverage = coverage(hit.alignment_length, gene_length, summary);
                out.protein.push(protein_row);
            }
            out.nucleotide.push(row);
        }

        debug!(
            nucleotide_rows = out.nucleotide.len(),
            protein_rows = out.protein.len(),
            "Reconciled alignment hits"
        );
        out
    }

    fn assemble(
        &self,
        query: &str,
        nucleotide_hit: &AlignmentHit,
        protein_hit: Option<&AlignmentHit>,
        summary: &mut RunSummary,
    ) -> ReconciledResult {
        let accession = &nucleotide_hit.hit.accession;
        let annotation = self.snapshot.annotation(accession);
        if annotation.is_none() {
            warn!(query, accession = %accession, "No stored annotation for nucleotide hit");
            summary.missing_reference_rows += 1;
        }

        let protein_id = protein_hit.and_then(|hit| hit.hit.protein_id.clone());
        let gene = protein_id.as_deref().and_then(|pid| self.snapshot.gene(pid));
        if protein_hit.is_some() && gene.is_none() {
            warn!(query, protein_id = ?protein_id, "No stored gene for protein hit");
            summary.missing_reference_rows += 1;
        }

        let (start, end) = nucleotide_hit.hit_bounds();
        ReconciledResult {
            query: query.to_string(),
            accession: accession.clone(),
            organism: annotation.map(|a| a.organism.clone()),
            taxonomy: annotation.map(|a| a.taxonomy.clone()),
            source_length: annotation.map(|a| a.source_length),
            gc_percent: annotation.and_then(|a| a.gc_content),
            protein_id,
            gene: gene.and_then(|g| g.gene.clone()),
            product: gene.and_then(|g| g.product.clone()),
            protein_hit: protein_hit.cloned(),
            nucleotide_hit: nucleotide_hit.clone(),
            coverage: coverage(
                nucleotide_hit.alignment_length,
                annotation.map(|a| a.source_length),
                summary,
            ),
            subsequence: annotation.and_then(|a| subsequence(&a.sequence, start, end)),
        }
    }
}

/// Aligned length over reference length, capped at 1
///
/// Gapped alignments can run longer than the reference. `None` when the
/// reference length is unknown or not positive; a zero length is counted in
/// the summary.
pub fn coverage(aligned: u64, reference: Option<i64>, summary: &mut RunSummary) -> Option<f64> {
    match reference {
        Some(length) if length > 0 => Some((aligned as f64 / length as f64).min(1.0)),
        Some(_) => {
            summary.zero_length_denominators += 1;
            None
        },
        None => None,
    }
}

/// Slice `[min(start, end) - 1 .. max(start, end)]` out of `sequence`
///
/// Positions are the 1-based subject coordinates of a hit, in either order.
/// The range is clamped to the sequence; an empty slice gives `None`.
pub fn subsequence(sequence: &str, hit_start: u64, hit_end: u64) -> Option<String> {
    let low = hit_start.min(hit_end).saturating_sub(1) as usize;
    let high = hit_start.max(hit_end) as usize;
    let high = high.min(sequence.len());
    if low >= high {
        return None;
    }
    sequence.get(low..high).map(str::to_string)
}
