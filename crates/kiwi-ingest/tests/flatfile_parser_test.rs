// Flat-file parser and isolator tests

use kiwi_ingest::flatfile::{isolate_entries, FlatFileParser, RecordFault, Strand};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const SAMPLE: &str = "tests/fixtures/sample.gbk";

#[test]
fn test_parse_sample_flat_file() {
    let data = fs::read_to_string(SAMPLE).expect("Failed to read sample file");

    let report = FlatFileParser::new()
        .parse_all(data.as_bytes())
        .expect("Failed to parse flat file");

    // Two usable records, one without an organism
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.skipped, 0);

    let record = &report.records[0];
    assert_eq!(record.accession, "NC_000001");
    assert_eq!(record.organism, "Test virus");
    assert_eq!(record.taxonomy, vec!["Viruses", "Testviricota", "Testviridae"]);
    assert_eq!(record.sequence, "ATGC".repeat(10));
    assert_eq!(record.sequence_length(), 40);
    assert_eq!(record.declared_length, Some(40));
    assert_eq!(record.gc_percent(), Some(50.0));
    assert_eq!(record.lines, 1..=28);

    assert_eq!(record.genes.len(), 1);
    let gene = &record.genes[0];
    assert_eq!(gene.protein_id, "YP_000001.1");
    assert_eq!(gene.gene.as_deref(), Some("tst"));
    assert_eq!(gene.product.as_deref(), Some("test protein"));
    assert_eq!(gene.molecule_type.as_deref(), Some("genomic DNA"));
    assert_eq!((gene.start, gene.end), (0, 30));
    assert_eq!(gene.protein_length(), 10);

    let failure = &report.failures[0];
    assert_eq!(failure.accession, "NC_000002");
    assert_eq!(failure.fault, RecordFault::MissingOrganism);
    assert_eq!(failure.lines, 29..=42);
}

#[test]
fn test_wrapped_location_and_qualifiers() {
    let data = fs::read_to_string(SAMPLE).expect("Failed to read sample file");
    let report = FlatFileParser::new().parse_all(data.as_bytes()).unwrap();

    let record = &report.records[1];
    assert_eq!(record.accession, "NC_000003");
    assert_eq!(record.accession_version.as_deref(), Some("NC_000003.2"));
    assert_eq!(
        record.taxonomy,
        vec!["Viruses", "Monodnaviria", "Shotokuvirae", "Cressdnaviricota"]
    );
    assert_eq!(record.sequence_length(), 36);

    let gene = &record.genes[0];
    assert_eq!(gene.location, "complement(join(4..12,19..33))");
    assert_eq!((gene.start, gene.end, gene.strand), (3, 33, Strand::Reverse));
    assert_eq!(gene.product.as_deref(), Some("replication-associated protein"));
    assert_eq!(gene.translation, "MRSVQLLGK");
}

#[test]
fn test_records_are_yielded_lazily() {
    let data = fs::read_to_string(SAMPLE).unwrap();
    let parser = FlatFileParser::new();
    let mut records = parser.records(data.as_bytes());

    let first = records.next().unwrap().unwrap();
    assert_eq!(first.accession, "NC_000001");
    assert!(records.failures().is_empty());

    // The malformed record is passed over on the way to the next good one
    let second = records.next().unwrap().unwrap();
    assert_eq!(second.accession, "NC_000003");
    assert_eq!(records.failures().len(), 1);
    assert!(records.next().is_none());
}

#[test]
fn test_each_pass_is_independent() {
    let data = fs::read_to_string(SAMPLE).unwrap();
    let parser = FlatFileParser::new();
    let first = parser.parse_all(data.as_bytes()).unwrap();
    let second = parser.parse_all(data.as_bytes()).unwrap();
    assert_eq!(first.records, second.records);
    assert!(second.failures.iter().all(|f| f.fault == RecordFault::MissingOrganism));
}

#[test]
fn test_isolate_failed_entry_span() {
    let ids: HashSet<String> = ["NC_000002".to_string()].into();
    let mut isolated = Vec::new();
    let summary = isolate_entries(Path::new(SAMPLE), &mut isolated, &ids).unwrap();
    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.written, 1);

    // Exactly the lines the parser reported for the failure
    let data = fs::read_to_string(SAMPLE).unwrap();
    let failure = &FlatFileParser::new().parse_all(data.as_bytes()).unwrap().failures[0];
    assert_eq!(failure.lines, 29..=42);
    let expected: String = data
        .lines()
        .skip(28)
        .take(14)
        .map(|line| format!("{line}\n"))
        .collect();
    assert_eq!(String::from_utf8(isolated).unwrap(), expected);
}

#[test]
fn test_record_boundaries_mid_file() {
    let data = fs::read_to_string(SAMPLE).unwrap();
    let lines: Vec<&str> = data.lines().collect();
    // Drop the "//" closing NC_000002 so NC_000003's LOCUS ends it
    let text: String = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 41)
        .map(|(_, line)| format!("{line}\n"))
        .collect();

    let report = FlatFileParser::new().parse_all(text.as_bytes()).unwrap();
    let accessions: Vec<&str> = report.records.iter().map(|r| r.accession.as_str()).collect();
    assert_eq!(accessions, vec!["NC_000001", "NC_000003"]);
    assert_eq!(report.records[0].lines, 1..=28);
    assert_eq!(report.records[1].lines, 42..=64);
    assert_eq!(report.records[1].genes.len(), 1);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].accession, "NC_000002");
    assert_eq!(report.failures[0].fault, RecordFault::Unterminated);
    assert_eq!(report.failures[0].lines, 29..=41);
}
