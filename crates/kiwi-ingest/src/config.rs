//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default database URL, a SQLite file in the working directory.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://kiwi.db";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default name of the gene table records are uploaded into.
pub const DEFAULT_GENE_TABLE: &str = "Genes";

/// Default e-value cutoff for a protein hit to count as significant.
pub const DEFAULT_EVALUE_THRESHOLD: f64 = crate::alignment::DEFAULT_EVALUE_THRESHOLD;

/// Default number of extraction workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default number of threads handed to BLAST/usearch.
pub const DEFAULT_THREADS: usize = 1;

/// Default number of ids per batched store query.
pub const DEFAULT_STORE_BATCH_SIZE: usize = 500;

/// Default location of the usearch executable.
pub const DEFAULT_USEARCH_PATH: &str = "./usearch";

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub pipeline: PipelineConfig,
    pub aligner: AlignerConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Upload, extract and reconcile settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub gene_table: String,
    pub evalue_threshold: f64,
    pub workers: usize,
    pub batch_size: usize,
}

/// External aligner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignerConfig {
    pub threads: usize,
    pub usearch_path: PathBuf,
    /// Directory holding the BLAST+ executables; `None` searches `PATH`
    pub blast_bin_dir: Option<PathBuf>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            database: DatabaseConfig {
                url: std::env::var("KIWI_DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or(
                    "KIWI_DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                connect_timeout_secs: env_or(
                    "KIWI_DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
            },
            pipeline: PipelineConfig {
                gene_table: std::env::var("KIWI_GENE_TABLE")
                    .unwrap_or_else(|_| DEFAULT_GENE_TABLE.to_string()),
                evalue_threshold: env_or("KIWI_EVALUE_THRESHOLD", DEFAULT_EVALUE_THRESHOLD),
                workers: env_or("KIWI_WORKERS", DEFAULT_WORKERS),
                batch_size: env_or("KIWI_STORE_BATCH_SIZE", DEFAULT_STORE_BATCH_SIZE),
            },
            aligner: AlignerConfig {
                threads: env_or("KIWI_THREADS", DEFAULT_THREADS),
                usearch_path: std::env::var("KIWI_USEARCH_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_USEARCH_PATH)),
                blast_bin_dir: std::env::var("KIWI_BLAST_BIN_DIR").ok().map(PathBuf::from),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        crate::store::validate_table_name(&self.pipeline.gene_table)?;

        if !(self.pipeline.evalue_threshold >= 0.0 && self.pipeline.evalue_threshold.is_finite()) {
            anyhow::bail!(
                "E-value threshold must be a non-negative number, got {}",
                self.pipeline.evalue_threshold
            );
        }

        if self.pipeline.workers == 0 {
            anyhow::bail!("Worker count must be greater than 0");
        }

        if self.pipeline.batch_size == 0 {
            anyhow::bail!("Store batch size must be greater than 0");
        }

        if self.aligner.threads == 0 {
            anyhow::bail!("Aligner thread count must be greater than 0");
        }

        if self.pipeline.workers as u32 > self.database.max_connections {
            tracing::warn!(
                workers = self.pipeline.workers,
                max_connections = self.database.max_connections,
                "More workers than pooled connections; extraction shards will queue"
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            pipeline: PipelineConfig {
                gene_table: DEFAULT_GENE_TABLE.to_string(),
                evalue_threshold: DEFAULT_EVALUE_THRESHOLD,
                workers: DEFAULT_WORKERS,
                batch_size: DEFAULT_STORE_BATCH_SIZE,
            },
            aligner: AlignerConfig {
                threads: DEFAULT_THREADS,
                usearch_path: PathBuf::from(DEFAULT_USEARCH_PATH),
                blast_bin_dir: None,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.gene_table, "Genes");
        assert_eq!(config.pipeline.evalue_threshold, 1e-5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.pipeline.workers = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.gene_table = "Genes; DROP TABLE Annotations".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.evalue_threshold = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.aligner.threads = 0;
        assert!(config.validate().is_err());
    }
}
