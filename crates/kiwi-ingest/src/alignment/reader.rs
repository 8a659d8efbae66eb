// Reader for 12-column tabular alignment output (blast outfmt 6, usearch blast6out)

use super::models::{AlignmentHit, HitId, HitMap};
use kiwi_common::{KiwiError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// Default significance cutoff for protein-level hits
pub const DEFAULT_EVALUE_THRESHOLD: f64 = 1e-5;

const COLUMNS: usize = 12;

/// Counters for one read
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadStats {
    pub lines: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub above_threshold: usize,
}

/// Hits kept from one alignment output file
#[derive(Debug, Default)]
pub struct AlignmentRead {
    pub hits: HitMap,
    pub stats: ReadStats,
}

/// Reads alignment output into a per-query best-hit map
///
/// Aligners emit hits best first, so the first line for a query is kept and
/// later lines for it are counted as duplicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignmentResultReader {
    threshold: Option<f64>,
}

impl AlignmentResultReader {
    /// Keep every well-formed hit (nucleotide stage)
    pub fn new() -> Self {
        Self { threshold: None }
    }

    /// Keep hits with `evalue <= threshold` (protein stage)
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold: Some(threshold),
        }
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn read_path(&self, path: &Path) -> Result<AlignmentRead> {
        let file = File::open(path).map_err(|e| {
            KiwiError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let read = self.read(BufReader::new(file))?;
        debug!(
            path = %path.display(),
            hits = read.hits.len(),
            malformed = read.stats.malformed,
            duplicates = read.stats.duplicates,
            above_threshold = read.stats.above_threshold,
            "Read alignment output"
        );
        Ok(read)
    }

    pub fn read<R: BufRead>(&self, reader: R) -> Result<AlignmentRead> {
        let mut out = AlignmentRead::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            out.stats.lines += 1;

            let hit = match parse_line(line) {
                Ok(hit) => hit,
                Err(reason) => {
                    warn!(line = index + 1, reason = %reason, "Skipping malformed alignment line");
                    out.stats.malformed += 1;
                    continue;
                },
            };

            if !seen.insert(hit.query_id.clone()) {
                out.stats.duplicates += 1;
                continue;
            }

            if let Some(threshold) = self.threshold {
                if hit.evalue > threshold {
                    out.stats.above_threshold += 1;
                    continue;
                }
            }

            out.hits.insert(hit.query_id.clone(), hit);
        }

        Ok(out)
    }
}

/// Parse one tab-separated line, returning the reason on failure
pub fn parse_line(line: &str) -> std::result::Result<AlignmentHit, String> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() < COLUMNS {
        return Err(format!(
            "expected {} tab-separated columns, found {}",
            COLUMNS,
            fields.len()
        ));
    }

    let float = |idx: usize, name: &str| -> std::result::Result<f64, String> {
        fields[idx]
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid {} '{}'", name, fields[idx]))
    };
    let count = |idx: usize, name: &str| -> std::result::Result<u64, String> {
        fields[idx]
            .parse::<u64>()
            .map_err(|_| format!("invalid {} '{}'", name, fields[idx]))
    };

    if fields[0].is_empty() {
        return Err("empty query id".to_string());
    }
    let hit = HitId::parse(fields[1])
        .filter(|id| !id.accession.is_empty())
        .ok_or_else(|| format!("ambiguous hit id '{}'", fields[1]))?;

    let evalue = float(10, "evalue")?;
    if evalue < 0.0 {
        return Err(format!("negative evalue '{}'", fields[10]));
    }

    Ok(AlignmentHit {
        query_id: fields[0].to_string(),
        hit,
        percent_identity: float(2, "pident")?,
        alignment_length: count(3, "length")?,
        mismatches: count(4, "mismatch")?,
        gap_opens: count(5, "gapopen")?,
        query_start: count(6, "qstart")?,
        query_end: count(7, "qend")?,
        hit_start: count(8, "sstart")?,
        hit_end: count(9, "send")?,
        evalue,
        bit_score: float(11, "bitscore")?,
    })
}
