//! Command tests against a file-backed store in a scratch directory

use kiwi_cli::commands;
use kiwi_cli::ExtractTarget;
use kiwi_ingest::aligner::NUCLEOTIDE_REFERENCE;
use kiwi_ingest::config::Config;
use kiwi_ingest::pipeline::FAILED_UPLOADS;
use std::fs;
use std::path::{Path, PathBuf};

fn sample() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../kiwi-ingest/tests/fixtures/sample.gbk")
}

fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.database.url = format!("sqlite://{}", dir.join("kiwi.db").display());
    config.pipeline.workers = 2;
    config
}

#[tokio::test]
async fn test_upload_extract_and_backup() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    commands::upload::run(&config, &sample(), false, dir.path(), true)
        .await
        .expect("upload failed");
    assert_eq!(
        fs::read_to_string(dir.path().join(FAILED_UPLOADS)).unwrap(),
        "NC_000002\n"
    );

    let refs = dir.path().join("db");
    commands::extract::run(&config, ExtractTarget::Dna, &refs, None)
        .await
        .expect("extract failed");
    let fasta = fs::read_to_string(refs.join(NUCLEOTIDE_REFERENCE)).unwrap();
    assert_eq!(fasta.matches('>').count(), 2);

    let backups = dir.path().join("backups");
    commands::backup::run(&config, &backups).await.expect("backup failed");
    assert_eq!(fs::read_dir(&backups).unwrap().count(), 1);
}

#[tokio::test]
async fn test_isolate_after_failed_upload() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    commands::upload::run(&config, &sample(), false, dir.path(), false).await.unwrap();

    let output = dir.path().join("failedEntries.gbff");
    commands::isolate::run(&sample(), &dir.path().join(FAILED_UPLOADS), &output).unwrap();

    let isolated = fs::read_to_string(&output).unwrap();
    assert!(isolated.starts_with("LOCUS       NC_000002"));
    assert!(isolated.ends_with("//\n"));
    assert!(!isolated.contains("NC_000001"));
}
