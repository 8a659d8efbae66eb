// End-to-end runs over the sample flat file and an in-memory store

use kiwi_ingest::alignment::AlignmentResultReader;
use kiwi_ingest::flatfile::{isolate_entries, read_accession_log};
use kiwi_ingest::pipeline::{extract_csv, extract_dna, extract_protein, upload_flat_file, UploadOptions, FAILED_UPLOADS};
use kiwi_ingest::reconcile::{reconcile_run, ReconcileInputs, NUCLEOTIDE_RESULTS, PROTEIN_RESULTS};
use kiwi_ingest::store::{ReferenceStore, SqliteStore, ANNOTATION_TABLE};
use kiwi_ingest::subset::write_significant_subset;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const SAMPLE: &str = "tests/fixtures/sample.gbk";
const GENES: &str = "Genes";

// query, hit, identity, length, mismatches, gaps, qstart, qend, sstart, send, evalue, bitscore
const NUCLEOTIDE_HITS: &str = "\
contig1\tNC_000001\t98.5\t20\t0\t0\t1\t20\t5\t14\t1e-30\t120
contig2\tNC_999999\t91.0\t50\t4\t0\t1\t50\t1\t50\t2e-10\t80
contig3\tNC_000003.2\t88.0\t18\t2\t0\t3\t20\t20\t3\t1e-8\t60
";

const PROTEIN_HITS: &str = "\
contig1\tNC_000001-YP_000001.1\t100.0\t5\t0\t0\t1\t15\t1\t5\t1e-20\t40
contig3\tNC_000003-YP_000003.1\t35.0\t9\t5\t1\t1\t27\t1\t9\t0.01\t12
";

async fn loaded_store(log_dir: &Path) -> SqliteStore {
    let store = SqliteStore::in_memory().await.expect("Failed to open in-memory store");
    let summary = upload_flat_file(
        &store,
        &UploadOptions {
            input: Path::new(SAMPLE),
            gene_table: GENES,
            skip_existing: true,
            log_dir,
        },
    )
    .await
    .expect("Upload failed");

    assert_eq!(summary.records_parsed, 2);
    assert_eq!(summary.records_stored, 2);
    assert_eq!(summary.malformed_records, 1);
    store
}

#[tokio::test]
async fn test_upload_logs_rejected_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = loaded_store(dir.path()).await;

    let failed = fs::read_to_string(dir.path().join(FAILED_UPLOADS)).unwrap();
    assert_eq!(failed, "NC_000002\n");

    let accessions = store.list_accessions(ANNOTATION_TABLE).await.unwrap();
    assert_eq!(accessions, vec!["NC_000001", "NC_000003"]);

    let gene = store.fetch_by_protein_id(GENES, "YP_000003.1").await.unwrap().unwrap();
    assert_eq!(gene.accession, "NC_000003");
    assert_eq!(gene.product.as_deref(), Some("replication-associated protein"));
    assert_eq!((gene.start, gene.end, gene.strand.as_str()), (3, 33, "-"));
    assert_eq!(gene.protein_length, 9);
}

#[tokio::test]
async fn test_second_upload_skips_stored_accessions() {
    let dir = tempfile::tempdir().unwrap();
    let store = loaded_store(dir.path()).await;

    let again = upload_flat_file(
        &store,
        &UploadOptions {
            input: Path::new(SAMPLE),
            gene_table: GENES,
            skip_existing: true,
            log_dir: dir.path(),
        },
    )
    .await
    .unwrap();

    assert_eq!(again.records_stored, 0);
    assert_eq!(again.records_skipped, 2);
    assert_eq!(store.list_protein_ids(GENES).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_extract_reference_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = loaded_store(dir.path()).await;
    let out = dir.path().join("db");

    let dna = extract_dna(&store, &out, 2).await.unwrap();
    let dna = fs::read_to_string(dna).unwrap();
    assert_eq!(
        dna,
        format!(">NC_000001\n{}\n>NC_000003\n{}\n", "ATGC".repeat(10), "AAACCCTTTGGG".repeat(3))
    );

    let protein = extract_protein(&store, GENES, &out, 2).await.unwrap();
    let protein = fs::read_to_string(protein).unwrap();
    assert_eq!(
        protein,
        ">NC_000001-YP_000001.1\nMHACMHACMH\n>NC_000003-YP_000003.1\nMRSVQLLGK\n"
    );

    // Sequences stay out of the CSV export
    let csv = extract_csv(&store, ANNOTATION_TABLE, &out, 3).await.unwrap();
    let csv = fs::read_to_string(csv).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("accession,organism,taxonomy"));
    assert_eq!(lines.count(), 2);
    assert!(!csv.contains("ATGCATGC"));
}

#[tokio::test]
async fn test_reconcile_run_writes_both_tables() {
    let dir = tempfile::tempdir().unwrap();
    let store = loaded_store(dir.path()).await;

    let nucleotide = dir.path().join("nucleotide.m8");
    let protein = dir.path().join("protein.m8");
    fs::write(&nucleotide, NUCLEOTIDE_HITS).unwrap();
    fs::write(&protein, PROTEIN_HITS).unwrap();

    let out = dir.path().join("results");
    let summary = reconcile_run(
        &store,
        GENES,
        &ReconcileInputs {
            protein_hits: protein,
            nucleotide_hits: nucleotide,
            evalue_threshold: 1e-5,
        },
        &out,
    )
    .await
    .unwrap();

    // contig2 has no stored annotation
    assert_eq!(summary.missing_reference_rows, 1);
    assert_eq!(summary.rows_written, 4);

    let mut reader = csv::Reader::from_path(out.join(NUCLEOTIDE_RESULTS)).unwrap();
    let header = reader.headers().unwrap().clone();
    assert_eq!(header.len(), 33);
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);

    let contig1 = &rows[0];
    assert_eq!(&contig1[0], "contig1");
    assert_eq!(&contig1[2], "Test virus");
    assert_eq!(&contig1[3], "Viruses; Testviricota; Testviridae");
    assert_eq!(&contig1[4], "40");
    assert_eq!(&contig1[5], "50.00");
    assert_eq!(&contig1[6], "YP_000001.1");
    assert_eq!(&contig1[7], "tst");
    assert_eq!(&contig1[9], "NC_000001-YP_000001.1");
    assert_eq!(&contig1[20], "NC_000001");
    assert_eq!(&contig1[31], "0.5000");
    assert_eq!(&contig1[32], "ATGCATGCAT");

    let contig2 = &rows[1];
    assert_eq!(&contig2[1], "NC_999999");
    for column in [2, 3, 4, 5, 6, 9, 31, 32] {
        assert_eq!(&contig2[column], "NA", "column {}", &header[column]);
    }

    // Versioned hit resolves to the stored accession; protein hit was not significant
    let contig3 = &rows[2];
    assert_eq!(&contig3[2], "Other virus");
    assert_eq!(&contig3[6], "NA");
    // Reverse-oriented hit: positions 3..=20
    assert_eq!(&contig3[32], "ACCCTTTGGGAAACCCTT");

    let mut reader = csv::Reader::from_path(out.join(PROTEIN_RESULTS)).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "contig1");
    // 5 aligned residues over a 10 residue translation
    assert_eq!(&rows[0][31], "0.5000");
}

#[tokio::test]
async fn test_significant_subset_from_protein_hits() {
    let dir = tempfile::tempdir().unwrap();
    let queries = dir.path().join("contigs.fasta");
    fs::write(&queries, ">contig1 len=30\nACGT\nACGT\n>contig2\nTTTT\n>contig3\nGGGG\n").unwrap();

    let hits = AlignmentResultReader::with_threshold(1e-5)
        .read(PROTEIN_HITS.as_bytes())
        .unwrap()
        .hits;
    let subset = write_significant_subset(&queries, &hits, dir.path()).unwrap();

    assert_eq!(fs::read_to_string(subset).unwrap(), ">contig1 len=30\nACGT\nACGT\n");
}

/// Lines `first..=last` (1-based) of the sample, newline terminated
fn sample_lines(first: usize, last: usize) -> String {
    fs::read_to_string(SAMPLE)
        .unwrap()
        .lines()
        .skip(first - 1)
        .take(last - first + 1)
        .map(|line| format!("{line}\n"))
        .collect()
}

/// Upload `flat`, then isolate whatever landed in the failed-uploads log
async fn upload_then_isolate(dir: &Path, flat: &str) -> (SqliteStore, String) {
    let input = dir.join("viral.gbff");
    fs::write(&input, flat).unwrap();

    let store = SqliteStore::in_memory().await.unwrap();
    upload_flat_file(
        &store,
        &UploadOptions {
            input: &input,
            gene_table: GENES,
            skip_existing: false,
            log_dir: dir,
        },
    )
    .await
    .unwrap();

    let failed: HashSet<String> = read_accession_log(&dir.join(FAILED_UPLOADS))
        .unwrap()
        .into_iter()
        .collect();
    let mut isolated = Vec::new();
    let summary = isolate_entries(&input, &mut isolated, &failed).unwrap();
    assert!(summary.missing.is_empty());

    // Isolating the isolated file again changes nothing
    let rerun = dir.join("failedEntries.gbff");
    fs::write(&rerun, &isolated).unwrap();
    let mut again = Vec::new();
    isolate_entries(&rerun, &mut again, &failed).unwrap();
    assert_eq!(again, isolated);

    (store, String::from_utf8(isolated).unwrap())
}

#[tokio::test]
async fn test_unterminated_entry_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    // NC_000001 loses its "//" and runs straight into NC_000003
    let unterminated = sample_lines(1, 27);
    let flat = format!("{unterminated}{}", sample_lines(43, 65));

    let (store, isolated) = upload_then_isolate(dir.path(), &flat).await;

    assert_eq!(fs::read_to_string(dir.path().join(FAILED_UPLOADS)).unwrap(), "NC_000001\n");
    assert_eq!(store.list_accessions(ANNOTATION_TABLE).await.unwrap(), vec!["NC_000003"]);
    assert!(store.fetch_by_protein_id(GENES, "YP_000001.1").await.unwrap().is_none());
    assert_eq!(isolated, unterminated);
}

#[tokio::test]
async fn test_duplicate_entry_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let record = sample_lines(43, 65);
    let flat = format!("{}{record}{record}", sample_lines(1, 28));

    let (store, isolated) = upload_then_isolate(dir.path(), &flat).await;

    assert_eq!(fs::read_to_string(dir.path().join(FAILED_UPLOADS)).unwrap(), "NC_000003\n");
    assert_eq!(
        store.list_accessions(ANNOTATION_TABLE).await.unwrap(),
        vec!["NC_000001", "NC_000003"]
    );
    // Only the rejected second copy, not the stored one
    assert_eq!(isolated, record);
}
