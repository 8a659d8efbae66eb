// Export stored reference data
//
// Identifier lists are sharded across the worker pool; each shard fetches its
// rows in batches and the shards are written out in order.

use crate::aligner::{NUCLEOTIDE_REFERENCE, PROTEIN_REFERENCE};
use crate::store::{AnnotationRow, GeneRow, ReferenceStore, ANNOTATION_TABLE};
use crate::worker::run_sharded;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

async fn annotation_rows<S>(store: &S, workers: usize) -> Result<Vec<AnnotationRow>>
where
    S: ReferenceStore + Clone + 'static,
{
    let ids = store
        .list_accessions(ANNOTATION_TABLE)
        .await
        .context("Failed to list accessions")?;

    let shards = run_sharded(&ids, workers, |index, shard| {
        let store = store.clone();
        async move {
            let mut found = store.fetch_annotations(&shard).await?;
            debug!(shard = index, ids = shard.len(), found = found.len(), "Fetched annotation shard");
            Ok::<_, anyhow::Error>(shard.iter().filter_map(|id| found.remove(id)).collect::<Vec<_>>())
        }
    })
    .await?;

    Ok(shards.into_iter().flatten().collect())
}

async fn gene_rows<S>(store: &S, gene_table: &str, workers: usize) -> Result<Vec<GeneRow>>
where
    S: ReferenceStore + Clone + 'static,
{
    let ids = store
        .list_protein_ids(gene_table)
        .await
        .with_context(|| format!("Failed to list protein ids in {}", gene_table))?;

    let shards = run_sharded(&ids, workers, |index, shard| {
        let store = store.clone();
        let table = gene_table.to_string();
        async move {
            let mut found = store.fetch_genes(&table, &shard).await?;
            debug!(shard = index, ids = shard.len(), found = found.len(), "Fetched gene shard");
            Ok::<_, anyhow::Error>(shard.iter().filter_map(|id| found.remove(id)).collect::<Vec<_>>())
        }
    })
    .await?;

    Ok(shards.into_iter().flatten().collect())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Write every row of `table` to `outdir/<table>.csv`, leaving out sequences
pub async fn extract_csv<S>(store: &S, table: &str, outdir: &Path, workers: usize) -> Result<PathBuf>
where
    S: ReferenceStore + Clone + 'static,
{
    std::fs::create_dir_all(outdir)?;
    let path = outdir.join(format!("{}.csv", table));
    let mut csv = csv::Writer::from_writer(create(&path)?);

    let count = if table == ANNOTATION_TABLE {
        let rows = annotation_rows(store, workers).await?;
        for row in &rows {
            csv.serialize(row)?;
        }
        rows.len()
    } else {
        let rows = gene_rows(store, table, workers).await?;
        for row in &rows {
            csv.serialize(row)?;
        }
        rows.len()
    };
    csv.flush()?;

    info!(table, rows = count, path = %path.display(), "Extracted table to CSV");
    Ok(path)
}

/// Write every stored genome to `outdir/viralRefSeq.fna`
pub async fn extract_dna<S>(store: &S, outdir: &Path, workers: usize) -> Result<PathBuf>
where
    S: ReferenceStore + Clone + 'static,
{
    std::fs::create_dir_all(outdir)?;
    let path = outdir.join(NUCLEOTIDE_REFERENCE);
    let rows = annotation_rows(store, workers).await?;

    let mut out = create(&path)?;
    for row in &rows {
        out.write_all(row.to_fasta().as_bytes())?;
    }
    out.flush()?;

    info!(sequences = rows.len(), path = %path.display(), "Extracted nucleotide references");
    Ok(path)
}

/// Write every stored translation to `outdir/viralRefProt.faa`
pub async fn extract_protein<S>(store: &S, gene_table: &str, outdir: &Path, workers: usize) -> Result<PathBuf>
where
    S: ReferenceStore + Clone + 'static,
{
    std::fs::create_dir_all(outdir)?;
    let path = outdir.join(PROTEIN_REFERENCE);
    let rows = gene_rows(store, gene_table, workers).await?;

    let mut out = create(&path)?;
    let mut written = 0usize;
    for row in rows.iter().filter(|row| !row.translation.is_empty()) {
        out.write_all(row.to_fasta().as_bytes())?;
        written += 1;
    }
    out.flush()?;

    info!(sequences = written, path = %path.display(), "Extracted protein references");
    Ok(path)
}
