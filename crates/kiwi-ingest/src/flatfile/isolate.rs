// Isolation of selected flat-file entries
//
// Copies the raw text of chosen records into a new flat file. Used to pull
// failed uploads out for inspection and to cut the new entries out of a fresh
// RefSeq release.

use super::models::MalformedRecord;
use super::parser::FlatFileParser;
use super::open_flat_file;
use kiwi_common::Result;
use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Write};
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::{debug, info};

/// Outcome of an isolation pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IsolateSummary {
    /// Records and rejected records seen in the input
    pub scanned: usize,
    /// Entries copied to the output
    pub written: usize,
    /// Requested accessions that never appeared
    pub missing: Vec<String>,
}

/// Read an accession log such as `failedUploads.txt`
///
/// One accession per line. Blank lines are ignored and repeats collapse to
/// their first occurrence.
pub fn read_accession_log(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    let mut seen = HashSet::new();
    let ids: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect();
    debug!(path = %path.display(), accessions = ids.len(), "Read accession log");
    Ok(ids)
}

/// Primary accession of every record, in file order
///
/// A cheap pass that only looks at ACCESSION lines, used to find the entries
/// of a new release that are not stored yet.
pub fn scan_accessions<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut accessions = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let mut tokens = line.split_whitespace();
        if tokens.next() == Some("ACCESSION") {
            if let Some(accession) = tokens.next() {
                accessions.push(accession.to_string());
            }
        }
    }
    Ok(accessions)
}

/// Line spans of the entries to isolate, in file order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntrySpans {
    pub spans: Vec<RangeInclusive<usize>>,
    /// Records and rejected records the parser delimited
    pub scanned: usize,
    /// Requested accessions that never appeared
    pub missing: Vec<String>,
}

/// Locate the entries of `ids` using the parser's own record boundaries
///
/// An accession the parser rejected yields the rejected span, so a duplicate
/// gives only the copy that was not stored and an unterminated record runs up
/// to the next record start or end of input. Otherwise the accepted record's
/// span is used.
pub fn locate_entries<R: BufRead>(reader: R, ids: &HashSet<String>) -> Result<EntrySpans> {
    let parser = FlatFileParser::new();
    let mut records = parser.records(reader);
    let mut scanned = 0;
    let mut accepted: HashMap<String, RangeInclusive<usize>> = HashMap::new();

    for record in records.by_ref() {
        let record = record?;
        scanned += 1;
        if ids.contains(&record.accession) {
            accepted.insert(record.accession, record.lines);
        }
    }
    let (failures, _) = records.finish();
    scanned += failures.len();

    let rejected: Vec<MalformedRecord> = failures
        .into_iter()
        .filter(|failure| ids.contains(&failure.accession))
        .collect();
    let rejected_ids: HashSet<&str> = rejected.iter().map(|f| f.accession.as_str()).collect();

    let mut spans: Vec<RangeInclusive<usize>> = rejected.iter().map(|f| f.lines.clone()).collect();
    spans.extend(
        accepted
            .iter()
            .filter(|(accession, _)| !rejected_ids.contains(accession.as_str()))
            .map(|(_, lines)| lines.clone()),
    );
    spans.sort_by_key(|span| *span.start());

    let mut missing: Vec<String> = ids
        .iter()
        .filter(|id| !accepted.contains_key(*id) && !rejected_ids.contains(id.as_str()))
        .cloned()
        .collect();
    missing.sort();

    Ok(EntrySpans {
        spans,
        scanned,
        missing,
    })
}

/// Copy the 1-based line `spans` of `reader` to `writer` byte for byte
///
/// Spans must be sorted and disjoint. Returns the number of lines copied.
pub fn copy_spans<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    spans: &[RangeInclusive<usize>],
) -> Result<usize> {
    let mut pending = spans.iter().peekable();
    let mut raw: Vec<u8> = Vec::new();
    let mut line_no = 0;
    let mut copied = 0;

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        line_no += 1;

        while pending.next_if(|span| *span.end() < line_no).is_some() {}
        match pending.peek() {
            Some(span) if span.contains(&line_no) => {
                writer.write_all(&raw)?;
                copied += 1;
            },
            Some(_) => {},
            None => break,
        }
    }
    writer.flush()?;
    Ok(copied)
}

/// Copy every entry whose accession is in `ids` from the flat file at `path`
///
/// Reads the file twice: once through the parser to find the spans, then
/// again to copy them unchanged.
pub fn isolate_entries<W: Write>(path: &Path, writer: W, ids: &HashSet<String>) -> Result<IsolateSummary> {
    let located = locate_entries(open_flat_file(path)?, ids)?;
    let lines = copy_spans(open_flat_file(path)?, writer, &located.spans)?;

    let summary = IsolateSummary {
        scanned: located.scanned,
        written: located.spans.len(),
        missing: located.missing,
    };
    info!(
        path = %path.display(),
        scanned = summary.scanned,
        written = summary.written,
        lines,
        missing = summary.missing.len(),
        "Isolated flat-file entries"
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TWO_RECORDS: &str = "\
LOCUS       AB000001   8 bp    DNA     linear   VRL 01-JAN-2017
ACCESSION   AB000001
ORIGIN
        1 atgcatgc
//
LOCUS       AB000002   4 bp    DNA     linear   VRL 01-JAN-2017
ACCESSION   AB000002 AB000099
ORIGIN\r
        1 ggcc\r
//\r
";

    fn ids(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn isolate_text(text: &str, wanted: &HashSet<String>) -> (IsolateSummary, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viral.gbff");
        std::fs::write(&path, text).unwrap();
        let mut out = Vec::new();
        let summary = isolate_entries(&path, &mut out, wanted).unwrap();
        (summary, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_isolate_copies_raw_span() {
        let (summary, text) = isolate_text(TWO_RECORDS, &ids(&["AB000002"]));
        assert!(text.starts_with("LOCUS       AB000002"));
        assert!(text.ends_with("//\r\n"));
        assert!(!text.contains("AB000001"));
        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.written, 1);
        assert!(summary.missing.is_empty());
    }

    #[test]
    fn test_isolate_is_idempotent() {
        let wanted = ids(&["AB000001", "AB000002"]);
        let (_, first) = isolate_text(TWO_RECORDS, &wanted);
        let (_, second) = isolate_text(&first, &wanted);
        assert_eq!(first, second);
        assert_eq!(first, TWO_RECORDS);
    }

    #[test]
    fn test_record_starting_at_accession() {
        let text = "ACCESSION   AC000010\nORIGIN\n        1 acgt\n//\n";
        let (summary, out) = isolate_text(text, &ids(&["AC000010", "GONE"]));
        assert_eq!(out, text);
        assert_eq!(summary.missing, vec!["GONE".to_string()]);
    }

    #[test]
    fn test_unterminated_record_runs_to_next_start() {
        let text = format!(
            "LOCUS       A1   4 bp\nACCESSION   A1\nORIGIN\n        1 acgt\n{}",
            TWO_RECORDS
        );
        let located = locate_entries(text.as_bytes(), &ids(&["A1"])).unwrap();
        assert_eq!(located.spans, vec![1..=4]);
        assert_eq!(located.scanned, 3);

        let (_, out) = isolate_text(&text, &ids(&["A1"]));
        assert_eq!(out, "LOCUS       A1   4 bp\nACCESSION   A1\nORIGIN\n        1 acgt\n");
    }

    #[test]
    fn test_unterminated_record_at_end_of_input() {
        let text = format!("{}LOCUS       A1   4 bp\nACCESSION   A1\nORIGIN\n", TWO_RECORDS);
        let (summary, out) = isolate_text(&text, &ids(&["A1"]));
        assert_eq!(summary.written, 1);
        assert_eq!(out, "LOCUS       A1   4 bp\nACCESSION   A1\nORIGIN\n");
    }

    #[test]
    fn test_duplicate_yields_rejected_copy_only() {
        let complete = "\
LOCUS       AB000003   8 bp    DNA     linear   VRL 01-JAN-2017
ACCESSION   AB000003
  ORGANISM  Test virus
FEATURES             Location/Qualifiers
     CDS             1..6
                     /protein_id=\"BAA00003.1\"
ORIGIN
        1 atgcatgc
//
";
        let text = format!("{complete}{complete}");
        let located = locate_entries(text.as_bytes(), &ids(&["AB000003"])).unwrap();
        assert_eq!(located.spans, vec![10..=18]);
        assert_eq!(located.scanned, 2);

        // With only one copy the stored record itself is isolated
        let located = locate_entries(complete.as_bytes(), &ids(&["AB000003"])).unwrap();
        assert_eq!(located.spans, vec![1..=9]);
    }

    #[test]
    fn test_copy_spans_skips_gaps() {
        let text = "a\nb\nc\nd\ne";
        let mut out = Vec::new();
        let copied = copy_spans(text.as_bytes(), &mut out, &[2..=2, 4..=5]).unwrap();
        assert_eq!(copied, 3);
        assert_eq!(out, b"b\nd\ne");
    }

    #[test]
    fn test_scan_accessions() {
        assert_eq!(
            scan_accessions(TWO_RECORDS.as_bytes()).unwrap(),
            vec!["AB000001", "AB000002"]
        );
    }

    #[test]
    fn test_read_accession_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failedUploads.txt");
        std::fs::write(&path, "NC_1\n\nNC_2\nNC_1\n  NC_3  \n").unwrap();
        assert_eq!(read_accession_log(&path).unwrap(), vec!["NC_1", "NC_2", "NC_3"]);
    }
}
