// Reference store
//
// Parsed flat-file records are kept in two tables: `Annotations` (one row per
// record) and a named gene table (one row per CDS). Reconciliation and
// extraction read them back through the same trait.

pub mod models;
pub mod sqlite;

pub use models::{AnnotationRow, GeneRow};
pub use sqlite::SqliteStore;

use crate::flatfile::FlatFileRecord;
use async_trait::async_trait;
use kiwi_common::{KiwiError, Result};
use std::collections::HashMap;

/// Name of the per-record table
pub const ANNOTATION_TABLE: &str = "Annotations";

/// Read/write access to stored reference records
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Create `Annotations` and `gene_table` if they do not exist
    async fn create_tables(&self, gene_table: &str) -> Result<()>;

    /// Insert one record and its genes atomically
    async fn insert_record(&self, gene_table: &str, record: &FlatFileRecord) -> Result<()>;

    async fn fetch_by_accession(&self, accession: &str) -> Result<Option<AnnotationRow>>;

    async fn fetch_by_protein_id(&self, gene_table: &str, protein_id: &str) -> Result<Option<GeneRow>>;

    /// Rows for every accession found, keyed by accession
    async fn fetch_annotations(&self, accessions: &[String]) -> Result<HashMap<String, AnnotationRow>>;

    /// Rows for every protein id found, keyed by protein id
    async fn fetch_genes(&self, gene_table: &str, protein_ids: &[String]) -> Result<HashMap<String, GeneRow>>;

    /// Distinct accessions in `table`, sorted
    async fn list_accessions(&self, table: &str) -> Result<Vec<String>>;

    /// Protein ids in `gene_table`, sorted
    async fn list_protein_ids(&self, gene_table: &str) -> Result<Vec<String>>;
}

/// Table names are spliced into SQL, so only `[A-Za-z_][A-Za-z0-9_]*` is accepted
pub fn validate_table_name(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(KiwiError::InvalidTable(name.to_string()))
    }
}

/// Accession without its `.N` version suffix, if it has one
pub fn strip_version(accession: &str) -> Option<&str> {
    let (base, version) = accession.rsplit_once('.')?;
    (!base.is_empty() && !version.is_empty() && version.chars().all(|c| c.is_ascii_digit()))
        .then_some(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("Genes").is_ok());
        assert!(validate_table_name("genes_2017").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2017genes").is_err());
        assert!(validate_table_name("Genes; DROP TABLE x").is_err());
    }

    #[test]
    fn test_strip_version() {
        assert_eq!(strip_version("NC_001416.1"), Some("NC_001416"));
        assert_eq!(strip_version("NC_001416"), None);
        assert_eq!(strip_version("NC_001416.x"), None);
    }
}
