// End-of-run counters
//
// Every recoverable condition is tallied here instead of aborting the run.

use serde::Serialize;
use std::fmt;
use tracing::info;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub records_parsed: usize,
    pub records_stored: usize,
    /// Passed over because the accession was already stored
    pub records_skipped: usize,
    pub failed_uploads: usize,
    pub malformed_records: usize,
    pub malformed_alignment_lines: usize,
    pub duplicate_alignment_lines: usize,
    pub missing_reference_rows: usize,
    pub zero_length_denominators: usize,
    pub rows_written: usize,
}

impl RunSummary {
    pub fn merge(&mut self, other: &RunSummary) {
        self.records_parsed += other.records_parsed;
        self.records_stored += other.records_stored;
        self.records_skipped += other.records_skipped;
        self.failed_uploads += other.failed_uploads;
        self.malformed_records += other.malformed_records;
        self.malformed_alignment_lines += other.malformed_alignment_lines;
        self.duplicate_alignment_lines += other.duplicate_alignment_lines;
        self.missing_reference_rows += other.missing_reference_rows;
        self.zero_length_denominators += other.zero_length_denominators;
        self.rows_written += other.rows_written;
    }

    /// Nothing was skipped or degraded
    pub fn is_clean(&self) -> bool {
        self.failed_uploads == 0
            && self.malformed_records == 0
            && self.malformed_alignment_lines == 0
            && self.missing_reference_rows == 0
            && self.zero_length_denominators == 0
    }

    pub fn log(&self) {
        info!(
            records_parsed = self.records_parsed,
            records_stored = self.records_stored,
            records_skipped = self.records_skipped,
            failed_uploads = self.failed_uploads,
            malformed_records = self.malformed_records,
            malformed_alignment_lines = self.malformed_alignment_lines,
            duplicate_alignment_lines = self.duplicate_alignment_lines,
            missing_reference_rows = self.missing_reference_rows,
            zero_length_denominators = self.zero_length_denominators,
            rows_written = self.rows_written,
            "Run summary"
        );
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = [
            ("Records parsed", self.records_parsed),
            ("Records stored", self.records_stored),
            ("Records already present", self.records_skipped),
            ("Failed uploads", self.failed_uploads),
            ("Malformed records", self.malformed_records),
            ("Malformed alignment lines", self.malformed_alignment_lines),
            ("Duplicate alignment lines", self.duplicate_alignment_lines),
            ("Missing reference rows", self.missing_reference_rows),
            ("Zero-length denominators", self.zero_length_denominators),
            ("Rows written", self.rows_written),
        ];
        for (label, count) in lines.iter().filter(|(_, count)| *count > 0) {
            writeln!(f, "  {:<28}{}", label, count)?;
        }
        Ok(())
    }
}
