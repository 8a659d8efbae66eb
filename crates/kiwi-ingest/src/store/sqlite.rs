// SQLite implementation of the reference store
//
// Bulk reads go through QueryBuilder with IN lists chunked to `batch_size`
// ids, which keeps every statement under SQLite's bound-parameter limit.

use super::models::{AnnotationRow, GeneRow};
use super::{validate_table_name, ReferenceStore, ANNOTATION_TABLE};
use crate::config::{DatabaseConfig, DEFAULT_STORE_BATCH_SIZE};
use crate::flatfile::FlatFileRecord;
use async_trait::async_trait;
use kiwi_common::{KiwiError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const ANNOTATION_COLUMNS: &str =
    "accession, organism, taxonomy, definition, molecule_type, source_length, gc_content, sequence";

const GENE_COLUMNS: &str = "protein_id, accession, gene, product, molecule_type, start_pos, end_pos, strand, protein_length, translation";

/// Reference store backed by a SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    batch_size: usize,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `config.url`
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await?;

        info!(url = %config.url, max_connections = config.max_connections, "Connected to reference store");
        Ok(Self::from_pool(pool))
    }

    /// Private in-memory database on a single long-lived connection
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            batch_size: DEFAULT_STORE_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for checked-out connections and close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Write a consistent copy of the database to `dir/kiwi.<date>.db`
    pub async fn backup(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let stamp = chrono::Local::now().format("%Y-%m-%d");
        let dest = dir.join(format!("kiwi.{}.db", stamp));
        if dest.exists() {
            return Err(KiwiError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", dest.display()),
            )));
        }

        sqlx::query("VACUUM INTO ?1")
            .bind(dest.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await?;

        info!(path = %dest.display(), "Backed up reference store");
        Ok(dest)
    }
}

#[async_trait]
impl ReferenceStore for SqliteStore {
    async fn create_tables(&self, gene_table: &str) -> Result<()> {
        let gene_table = validate_table_name(gene_table)?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {ANNOTATION_TABLE} (
                accession TEXT PRIMARY KEY NOT NULL,
                organism TEXT NOT NULL,
                taxonomy TEXT NOT NULL,
                definition TEXT NOT NULL,
                molecule_type TEXT,
                source_length INTEGER NOT NULL,
                gc_content REAL,
                sequence TEXT NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {gene_table} (
                protein_id TEXT PRIMARY KEY NOT NULL,
                accession TEXT NOT NULL,
                gene TEXT,
                product TEXT,
                molecule_type TEXT,
                start_pos INTEGER NOT NULL,
                end_pos INTEGER NOT NULL,
                strand TEXT NOT NULL,
                protein_length INTEGER NOT NULL,
                translation TEXT NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{gene_table}_accession ON {gene_table} (accession)"
        ))
        .execute(&self.pool)
        .await?;

        debug!(gene_table, "Ensured reference tables exist");
        Ok(())
    }

    async fn insert_record(&self, gene_table: &str, record: &FlatFileRecord) -> Result<()> {
        let gene_table = validate_table_name(gene_table)?;
        let annotation = AnnotationRow::from_record(record);
        let genes: Vec<GeneRow> = record
            .genes
            .iter()
            .map(|feature| GeneRow::from_feature(&record.accession, feature))
            .collect();

        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO {ANNOTATION_TABLE} ({ANNOTATION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ))
        .bind(&annotation.accession)
        .bind(&annotation.organism)
        .bind(&annotation.taxonomy)
        .bind(&annotation.definition)
        .bind(&annotation.molecule_type)
        .bind(annotation.source_length)
        .bind(annotation.gc_content)
        .bind(&annotation.sequence)
        .execute(&mut *tx)
        .await?;

        for chunk in genes.chunks(self.batch_size) {
            let mut query_builder: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("INSERT INTO {gene_table} ({GENE_COLUMNS}) "));

            query_builder.push_values(chunk.iter(), |mut b, gene| {
                b.push_bind(&gene.protein_id)
                    .push_bind(&gene.accession)
                    .push_bind(&gene.gene)
                    .push_bind(&gene.product)
                    .push_bind(&gene.molecule_type)
                    .push_bind(gene.start)
                    .push_bind(gene.end)
                    .push_bind(&gene.strand)
                    .push_bind(gene.protein_length)
                    .push_bind(&gene.translation);
            });

            query_builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        debug!(accession = %record.accession, genes = genes.len(), "Inserted record");
        Ok(())
    }

    async fn fetch_by_accession(&self, accession: &str) -> Result<Option<AnnotationRow>> {
        let row = sqlx::query_as::<_, AnnotationRow>(&format!(
            "SELECT {ANNOTATION_COLUMNS} FROM {ANNOTATION_TABLE} WHERE accession = ?1"
        ))
        .bind(accession)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn fetch_by_protein_id(&self, gene_table: &str, protein_id: &str) -> Result<Option<GeneRow>> {
        let gene_table = validate_table_name(gene_table)?;
        let row = sqlx::query_as::<_, GeneRow>(&format!(
            "SELECT {GENE_COLUMNS} FROM {gene_table} WHERE protein_id = ?1"
        ))
        .bind(protein_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn fetch_annotations(&self, accessions: &[String]) -> Result<HashMap<String, AnnotationRow>> {
        let mut found = HashMap::with_capacity(accessions.len());

        for chunk in accessions.chunks(self.batch_size) {
            let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "SELECT {ANNOTATION_COLUMNS} FROM {ANNOTATION_TABLE} WHERE accession IN ("
            ));
            let mut separated = query_builder.separated(", ");
            for accession in chunk {
                separated.push_bind(accession);
            }
            separated.push_unseparated(")");

            let rows = query_builder
                .build_query_as::<AnnotationRow>()
                .fetch_all(&self.pool)
                .await?;
            found.extend(rows.into_iter().map(|row| (row.accession.clone(), row)));
        }

        debug!(requested = accessions.len(), found = found.len(), "Fetched annotation rows");
        Ok(found)
    }

    async fn fetch_genes(&self, gene_table: &str, protein_ids: &[String]) -> Result<HashMap<String, GeneRow>> {
        let gene_table = validate_table_name(gene_table)?;
        let mut found = HashMap::with_capacity(protein_ids.len());

        for chunk in protein_ids.chunks(self.batch_size) {
            let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "SELECT {GENE_COLUMNS} FROM {gene_table} WHERE protein_id IN ("
            ));
            let mut separated = query_builder.separated(", ");
            for protein_id in chunk {
                separated.push_bind(protein_id);
            }
            separated.push_unseparated(")");

            let rows = query_builder
                .build_query_as::<GeneRow>()
                .fetch_all(&self.pool)
                .await?;
            found.extend(rows.into_iter().map(|row| (row.protein_id.clone(), row)));
        }

        debug!(gene_table, requested = protein_ids.len(), found = found.len(), "Fetched gene rows");
        Ok(found)
    }

    async fn list_accessions(&self, table: &str) -> Result<Vec<String>> {
        let table = validate_table_name(table)?;
        let rows = sqlx::query(&format!(
            "SELECT DISTINCT accession FROM {table} ORDER BY accession"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("accession").map_err(KiwiError::from))
            .collect()
    }

    async fn list_protein_ids(&self, gene_table: &str) -> Result<Vec<String>> {
        let gene_table = validate_table_name(gene_table)?;
        let ids = sqlx::query_scalar::<_, String>(&format!(
            "SELECT protein_id FROM {gene_table} ORDER BY protein_id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
