// Significance filter and FASTA subsetter
//
// After the protein-stage search only queries with a significant protein hit
// go on to the nucleotide stage. Their sequences are copied out of the query
// FASTA into a smaller file.

use crate::alignment::HitMap;
use kiwi_common::{KiwiError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the derived FASTA inside the output directory
pub const SIGNIFICANT_FASTA: &str = "significant.fasta";

/// Query ids that passed the protein-stage cutoff
pub fn significant_ids(protein_hits: &HitMap) -> HashSet<&str> {
    protein_hits.keys().map(String::as_str).collect()
}

/// Id of a FASTA header: the first whitespace-delimited token after `>`
///
/// This is the same token aligners report as the query id.
pub fn header_id(header: &str) -> &str {
    header
        .trim_start_matches('>')
        .split_whitespace()
        .next()
        .unwrap_or_default()
}

/// Copy the records of `reader` whose id is in `ids` to `writer`
///
/// Each kept record is its header plus every line up to the next header or
/// end of input, copied unchanged. Returns the number of records written.
pub fn subset_fasta<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    ids: &HashSet<&str>,
) -> Result<usize> {
    let mut keep = false;
    let mut written = 0;

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('>') {
            keep = ids.contains(header_id(&line));
            if keep {
                written += 1;
            }
        }
        if keep {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush()?;
    Ok(written)
}

/// Write the significant queries of `query_fasta` to `outdir/significant.fasta`
///
/// Returns the path of the derived file, which is created even when no query
/// was significant.
pub fn write_significant_subset(
    query_fasta: &Path,
    protein_hits: &HitMap,
    outdir: &Path,
) -> Result<PathBuf> {
    let input = File::open(query_fasta).map_err(|e| {
        KiwiError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", query_fasta.display(), e),
        ))
    })?;
    let path = outdir.join(SIGNIFICANT_FASTA);
    let output = BufWriter::new(File::create(&path)?);

    let ids = significant_ids(protein_hits);
    let written = subset_fasta(BufReader::new(input), output, &ids)?;

    info!(
        significant = ids.len(),
        written,
        path = %path.display(),
        "Wrote significant query subset"
    );
    Ok(path)
}
