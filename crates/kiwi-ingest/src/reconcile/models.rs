// Reconciliation inputs and outputs

use crate::alignment::AlignmentHit;
use crate::store::{strip_version, AnnotationRow, GeneRow};
use std::collections::HashMap;

/// Stored rows needed for one reconciliation, fetched up front
#[derive(Debug, Default, Clone)]
pub struct ReferenceSnapshot {
    annotations: HashMap<String, AnnotationRow>,
    genes: HashMap<String, GeneRow>,
}

impl ReferenceSnapshot {
    pub fn new(annotations: HashMap<String, AnnotationRow>, genes: HashMap<String, GeneRow>) -> Self {
        Self { annotations, genes }
    }

    /// Annotation for `accession`, retrying without a `.N` version suffix
    pub fn annotation(&self, accession: &str) -> Option<&AnnotationRow> {
        self.annotations
            .get(accession)
            .or_else(|| strip_version(accession).and_then(|base| self.annotations.get(base)))
    }

    pub fn gene(&self, protein_id: &str) -> Option<&GeneRow> {
        self.genes.get(protein_id)
    }

    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    pub fn gene_count(&self) -> usize {
        self.genes.len()
    }
}

/// One output row
///
/// Annotation fields come from the nucleotide hit's accession; gene fields
/// come from the protein hit's protein id. `None` is written as "NA".
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledResult {
    pub query: String,
    pub accession: String,
    pub organism: Option<String>,
    pub taxonomy: Option<String>,
    pub source_length: Option<i64>,
    pub gc_percent: Option<f64>,

    pub protein_id: Option<String>,
    pub gene: Option<String>,
    pub product: Option<String>,

    pub protein_hit: Option<AlignmentHit>,
    pub nucleotide_hit: AlignmentHit,

    /// Aligned length over the reference length of this row's stream
    pub coverage: Option<f64>,
    pub subsequence: Option<String>,
}

/// Both output streams, in nucleotide hit-map order
#[derive(Debug, Default, Clone)]
pub struct Reconciliation {
    /// Every query with a nucleotide hit; coverage over the source length
    pub nucleotide: Vec<ReconciledResult>,
    /// Rows that also have a protein hit; coverage over the protein length
    pub protein: Vec<ReconciledResult>,
}
