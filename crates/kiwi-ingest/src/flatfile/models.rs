// Data models for GenBank flat-file records

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

/// Coding strand of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Strand::Forward),
            "-" => Some(Strand::Reverse),
            _ => None,
        }
    }
}

/// CDS feature of a flat-file record
///
/// `start`/`end` are 0-based half-open; the flat file's `190..255` becomes
/// `start = 189, end = 255`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneFeature {
    pub protein_id: String,
    pub gene: Option<String>,
    pub product: Option<String>,
    pub molecule_type: Option<String>,
    pub translation: String,
    pub location: String,
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
}

impl GeneFeature {
    /// Nucleotide span covered by the feature
    pub fn span(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Length of the translated product in amino acids
    pub fn protein_length(&self) -> usize {
        self.translation.len()
    }
}

/// One parsed GenBank entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatFileRecord {
    // LOCUS line
    pub locus_name: String,
    pub declared_length: Option<usize>,
    pub molecule_type: Option<String>,

    pub definition: String,
    pub accession: String,
    pub accession_version: Option<String>,

    // SOURCE/ORGANISM
    pub organism: String,
    pub taxonomy: Vec<String>,

    pub genes: Vec<GeneFeature>,

    // ORIGIN, upper-cased
    pub sequence: String,

    /// 1-based line numbers of the record's first line and its `//`
    pub lines: RangeInclusive<usize>,
}

impl FlatFileRecord {
    pub fn sequence_length(&self) -> usize {
        self.sequence.len()
    }

    /// Lineage in the form it is stored: "Viruses; Duplodnaviria; ..."
    pub fn taxonomy_string(&self) -> String {
        self.taxonomy.join("; ")
    }

    /// GC content as a percentage of the sequence length
    pub fn gc_percent(&self) -> Option<f64> {
        gc_percent(&self.sequence)
    }

    /// FASTA entry for the nucleotide reference database
    pub fn to_fasta(&self) -> String {
        format!(">{}\n{}\n", self.accession, self.sequence)
    }
}

/// GC content of `sequence` in percent; `None` for an empty sequence
pub fn gc_percent(sequence: &str) -> Option<f64> {
    if sequence.is_empty() {
        return None;
    }
    let gc = sequence
        .bytes()
        .filter(|b| matches!(b.to_ascii_uppercase(), b'G' | b'C'))
        .count();
    Some(gc as f64 / sequence.len() as f64 * 100.0)
}

/// Why a record was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordFault {
    #[error("missing ACCESSION")]
    MissingAccession,

    #[error("missing ORGANISM")]
    MissingOrganism,

    #[error("no CDS feature with a protein_id")]
    NoGeneFeatures,

    #[error("record not terminated by '//'")]
    Unterminated,

    #[error("accession already seen at line {0}")]
    DuplicateAccession(usize),
}

/// A record that was read but could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    /// Accession if one was found, otherwise "unknown"
    pub accession: String,
    pub fault: RecordFault,
    pub lines: RangeInclusive<usize>,
}

impl std::fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (lines {}-{}): {}",
            self.accession,
            self.lines.start(),
            self.lines.end(),
            self.fault
        )
    }
}
