// Store-facing pipelines
//
// upload: flat file -> store
// extract: store -> CSV / reference FASTA
// update: new RefSeq release -> store -> reference FASTA -> aligner databases

pub mod extract;
pub mod update;
pub mod upload;

pub use extract::{extract_csv, extract_dna, extract_protein};
pub use update::{run_update, UpdateOptions, UpdateStage};
pub use upload::{upload_flat_file, UploadOptions};

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Accessions that could not be stored, one per line
pub const FAILED_UPLOADS: &str = "failedUploads.txt";

/// Append `accessions` to the failed-upload log in `dir`
pub fn append_failed_log(dir: &Path, accessions: &[String]) -> Result<()> {
    if accessions.is_empty() {
        return Ok(());
    }
    let path = dir.join(FAILED_UPLOADS);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    for accession in accessions {
        writeln!(file, "{}", accession)?;
    }
    tracing::warn!(path = %path.display(), count = accessions.len(), "Recorded failed uploads");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        append_failed_log(dir.path(), &["NC_1".to_string()]).unwrap();
        append_failed_log(dir.path(), &[]).unwrap();
        append_failed_log(dir.path(), &["NC_2".to_string()]).unwrap();
        let text = std::fs::read_to_string(dir.path().join(FAILED_UPLOADS)).unwrap();
        assert_eq!(text, "NC_1\nNC_2\n");
    }
}
