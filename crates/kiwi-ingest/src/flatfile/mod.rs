// GenBank flat-file handling
//
// Parsing of viral RefSeq flat files into records, plus isolation of the raw
// text of failed entries so they can be re-uploaded on their own.

pub mod isolate;
pub mod models;
pub mod parser;

pub use isolate::{
    copy_spans, isolate_entries, locate_entries, read_accession_log, scan_accessions, EntrySpans, IsolateSummary,
};
pub use models::{FlatFileRecord, GeneFeature, MalformedRecord, RecordFault, Strand};
pub use parser::{parse_location, FlatFileParser, FlatFileRecords, ParseReport};

use flate2::read::GzDecoder;
use kiwi_common::{KiwiError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Open a flat file for line reading, decompressing `.gz` input on the fly
pub fn open_flat_file(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).map_err(|e| {
        KiwiError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;

    if path.extension().is_some_and(|ext| ext == "gz") {
        debug!(path = %path.display(), "Reading gzip-compressed flat file");
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_open_plain_and_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("viral.gbff");
        std::fs::write(&plain, "LOCUS       A\n//\n").unwrap();

        let gz = dir.path().join("viral.gbff.gz");
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(b"LOCUS       A\n//\n").unwrap();
        encoder.finish().unwrap();

        for path in [plain, gz] {
            let lines: Vec<String> = open_flat_file(&path)
                .unwrap()
                .lines()
                .collect::<std::io::Result<_>>()
                .unwrap();
            assert_eq!(lines, vec!["LOCUS       A", "//"]);
        }
    }

    #[test]
    fn test_open_missing_file_names_path() {
        let err = match open_flat_file(Path::new("/nonexistent/viral.gbff")) {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(err.to_string().contains("/nonexistent/viral.gbff"));
    }
}
