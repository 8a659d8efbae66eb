//! `kiwi isolate` command implementation
//!
//! Copies the raw text of the listed entries into a new flat file so they can
//! be fixed by hand and uploaded again.

use anyhow::{Context, Result};
use kiwi_ingest::flatfile::{isolate_entries, read_accession_log, IsolateSummary};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub fn isolate(input: &Path, ids: &Path, output: &Path) -> Result<IsolateSummary> {
    let wanted: HashSet<String> = read_accession_log(ids)
        .with_context(|| format!("Failed to read accession list {}", ids.display()))?
        .into_iter()
        .collect();

    let writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );
    isolate_entries(input, writer, &wanted).with_context(|| format!("Failed to isolate entries of {}", input.display()))
}

pub fn run(input: &Path, ids: &Path, output: &Path) -> Result<()> {
    let summary = isolate(input, ids, output)?;

    println!(
        "Isolated {} of {} entries into {}",
        summary.written,
        summary.scanned,
        output.display()
    );
    if !summary.missing.is_empty() {
        println!("  Not found: {}", summary.missing.join(", "));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FLAT: &str = "LOCUS       A1\nACCESSION   A1\n//\nLOCUS       B2\nACCESSION   B2\n//\n";

    #[test]
    fn test_isolate_listed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.gbff");
        let ids = dir.path().join("failedUploads.txt");
        let output = dir.path().join("out.gbff");
        std::fs::write(&input, FLAT).unwrap();
        std::fs::write(&ids, "B2\nC3\n").unwrap();

        let summary = isolate(&input, &ids, &output).unwrap();
        assert_eq!(summary.written, 1);
        assert_eq!(summary.missing, vec!["C3".to_string()]);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "LOCUS       B2\nACCESSION   B2\n//\n"
        );
    }
}
