// Stored row types

use crate::flatfile::{FlatFileRecord, GeneFeature};
use serde::{Deserialize, Serialize};

/// Row of the `Annotations` table, one per flat-file record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnnotationRow {
    pub accession: String,
    pub organism: String,
    /// Lineage joined with "; "
    pub taxonomy: String,
    pub definition: String,
    pub molecule_type: Option<String>,
    pub source_length: i64,
    /// Percent, 0 to 100
    pub gc_content: Option<f64>,
    #[serde(skip_serializing)]
    pub sequence: String,
}

impl AnnotationRow {
    pub fn from_record(record: &FlatFileRecord) -> Self {
        Self {
            accession: record.accession.clone(),
            organism: record.organism.clone(),
            taxonomy: record.taxonomy_string(),
            definition: record.definition.clone(),
            molecule_type: record.molecule_type.clone(),
            source_length: record.sequence_length() as i64,
            gc_content: record.gc_percent(),
            sequence: record.sequence.clone(),
        }
    }

    /// FASTA entry for the nucleotide reference file
    pub fn to_fasta(&self) -> String {
        format!(">{}\n{}\n", self.accession, self.sequence)
    }
}

/// Row of a gene table, one per CDS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeneRow {
    pub protein_id: String,
    pub accession: String,
    pub gene: Option<String>,
    pub product: Option<String>,
    pub molecule_type: Option<String>,
    #[sqlx(rename = "start_pos")]
    pub start: i64,
    #[sqlx(rename = "end_pos")]
    pub end: i64,
    pub strand: String,
    /// Amino acids in the translation
    pub protein_length: i64,
    #[serde(skip_serializing)]
    pub translation: String,
}

impl GeneRow {
    pub fn from_feature(accession: &str, feature: &GeneFeature) -> Self {
        Self {
            protein_id: feature.protein_id.clone(),
            accession: accession.to_string(),
            gene: feature.gene.clone(),
            product: feature.product.clone(),
            molecule_type: feature.molecule_type.clone(),
            start: feature.start as i64,
            end: feature.end as i64,
            strand: feature.strand.as_str().to_string(),
            protein_length: feature.protein_length() as i64,
            translation: feature.translation.clone(),
        }
    }

    /// FASTA entry for the protein reference file, keyed `accession-proteinID`
    pub fn to_fasta(&self) -> String {
        format!(">{}-{}\n{}\n", self.accession, self.protein_id, self.translation)
    }
}
