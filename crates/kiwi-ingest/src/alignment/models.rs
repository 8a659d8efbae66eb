// Tabular alignment hit models

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Subject identifier of a hit
///
/// Protein reference databases are built with `>accession-proteinID`
/// headers, so protein hits carry both halves. Nucleotide hits carry only the
/// accession.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HitId {
    pub accession: String,
    pub protein_id: Option<String>,
}

impl HitId {
    /// Split a subject id on its single `-`
    ///
    /// Returns `None` when the id contains more than one `-`, since the
    /// split point is then ambiguous. An id without `-`, or with an empty
    /// side, is taken as a plain accession.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.matches('-').count() {
            0 => Some(Self::plain(raw)),
            1 => match raw.split_once('-') {
                Some((acc, pid)) if !acc.is_empty() && !pid.is_empty() => Some(Self {
                    accession: acc.to_string(),
                    protein_id: Some(pid.to_string()),
                }),
                _ => Some(Self::plain(raw)),
            },
            _ => None,
        }
    }

    fn plain(raw: &str) -> Self {
        Self {
            accession: raw.to_string(),
            protein_id: None,
        }
    }
}

impl std::fmt::Display for HitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.protein_id {
            Some(pid) => write!(f, "{}-{}", self.accession, pid),
            None => f.write_str(&self.accession),
        }
    }
}

/// One line of 12-column tabular output
///
/// `qseqid sseqid pident length mismatch gapopen qstart qend sstart send evalue bitscore`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentHit {
    pub query_id: String,
    pub hit: HitId,
    pub percent_identity: f64,
    pub alignment_length: u64,
    pub mismatches: u64,
    pub gap_opens: u64,
    pub query_start: u64,
    pub query_end: u64,
    /// Start on the subject, 1-based; greater than `hit_end` on reverse-strand hits
    pub hit_start: u64,
    pub hit_end: u64,
    pub evalue: f64,
    pub bit_score: f64,
}

impl AlignmentHit {
    /// Subject span as (min, max) of the 1-based start/end
    pub fn hit_bounds(&self) -> (u64, u64) {
        (self.hit_start.min(self.hit_end), self.hit_start.max(self.hit_end))
    }

    /// Columns in output order, after the two id columns
    pub fn numeric_fields(&self) -> [String; 10] {
        [
            self.percent_identity.to_string(),
            self.alignment_length.to_string(),
            self.mismatches.to_string(),
            self.gap_opens.to_string(),
            self.query_start.to_string(),
            self.query_end.to_string(),
            self.hit_start.to_string(),
            self.hit_end.to_string(),
            format_evalue(self.evalue),
            self.bit_score.to_string(),
        ]
    }
}

/// Best hit per query, in the order queries first appeared
pub type HitMap = IndexMap<String, AlignmentHit>;

/// Print e-values the way aligners do ("1e-50", "0.002")
pub fn format_evalue(evalue: f64) -> String {
    if evalue != 0.0 && evalue.abs() < 1e-3 {
        format!("{:e}", evalue)
    } else {
        evalue.to_string()
    }
}
