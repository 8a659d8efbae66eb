//! Kiwi CLI Library
//!
//! Command-line interface for the viral discovery pipeline.
//!
//! - **Reference store**: load GenBank releases (`kiwi upload`, `kiwi update`),
//!   export them (`kiwi extract`) and snapshot them (`kiwi backup`)
//! - **Search**: build aligner databases (`kiwi makedb`) and run the two-stage
//!   search (`kiwi search`)
//! - **Results**: join hits with stored annotations (`kiwi reconcile`)
//! - **Repair**: pull rejected entries out of a flat file (`kiwi isolate`)

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use kiwi_ingest::aligner::SearchTool;
use kiwi_ingest::config::Config;
use kiwi_ingest::pipeline::UpdateStage;
use std::path::PathBuf;

/// Kiwi - viral discovery against a RefSeq-derived reference store
#[derive(Parser, Debug)]
#[command(name = "kiwi")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub overrides: Overrides,
}

/// Flags taking precedence over `KIWI_*` environment settings
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Reference store URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Gene table name
    #[arg(long, global = true)]
    pub gene_table: Option<String>,

    /// Worker pool size
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Threads handed to each aligner process
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Protein-stage e-value threshold
    #[arg(short, long, global = true)]
    pub evalue: Option<f64>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref url) = self.database_url {
            config.database.url = url.clone();
        }
        if let Some(ref table) = self.gene_table {
            config.pipeline.gene_table = table.clone();
        }
        if let Some(workers) = self.workers {
            config.pipeline.workers = workers;
        }
        if let Some(threads) = self.threads {
            config.aligner.threads = threads;
        }
        if let Some(evalue) = self.evalue {
            config.pipeline.evalue_threshold = evalue;
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a GenBank flat file and store its records
    Upload {
        /// Flat file, plain or gzipped
        input: PathBuf,

        /// Insert every record, including accessions already stored
        #[arg(long)]
        all: bool,

        /// Directory for failedUploads.txt
        #[arg(long, default_value = ".")]
        log_dir: PathBuf,
    },

    /// Copy the raw text of selected entries out of a flat file
    Isolate {
        /// Flat file, plain or gzipped
        input: PathBuf,

        /// Accession list, one per line
        #[arg(long, default_value = "failedUploads.txt")]
        ids: PathBuf,

        /// Destination flat file
        #[arg(short, long, default_value = "failedEntries.gbff")]
        output: PathBuf,
    },

    /// Run the protein-stage then nucleotide-stage search
    Search {
        /// Query contigs in FASTA format
        query: PathBuf,

        /// Directory holding the reference databases
        #[arg(long, default_value = "db")]
        dbdir: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        outdir: PathBuf,

        /// Aligner family; ublast unless "blast" is asked for
        #[arg(long, default_value = "ublast")]
        tool: SearchTool,

        /// Reconcile the hits against the store once the search finishes
        #[arg(long)]
        reconcile: bool,
    },

    /// Build aligner databases from the reference FASTA files
    Makedb {
        #[arg(long, default_value = "db")]
        dbdir: PathBuf,

        #[arg(long, default_value = "ublast")]
        tool: SearchTool,
    },

    /// Join alignment hits with stored annotations into CSV tables
    Reconcile {
        /// Protein-stage tabular output
        #[arg(long)]
        protein_hits: PathBuf,

        /// Nucleotide-stage tabular output
        #[arg(long)]
        nucleotide_hits: PathBuf,

        #[arg(short, long, default_value = ".")]
        outdir: PathBuf,
    },

    /// Export stored references
    Extract {
        #[arg(value_enum)]
        what: ExtractTarget,

        #[arg(short, long, default_value = "db")]
        outdir: PathBuf,

        /// Table to export as CSV (defaults to the annotation table)
        #[arg(long)]
        table: Option<String>,
    },

    /// Write a dated copy of the reference store
    Backup {
        #[arg(default_value = "backups")]
        dir: PathBuf,
    },

    /// Bring the store and aligner databases up to a new RefSeq release
    Update {
        /// Release flat file, plain or gzipped
        refseq: PathBuf,

        #[arg(long, default_value = "db")]
        dbdir: PathBuf,

        /// Scratch directory for the new-entry subset and failure log
        #[arg(long, default_value = ".")]
        workdir: PathBuf,

        /// Stage to resume from: identify, upload, extract, makedb
        #[arg(long, default_value = "identify")]
        from: UpdateStage,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractTarget {
    /// One table as CSV, sequences left out
    Csv,
    /// Nucleotide reference FASTA
    Dna,
    /// Protein reference FASTA
    Protein,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_with_overrides() {
        let cli = Cli::try_parse_from([
            "kiwi", "search", "contigs.fa", "--tool", "ublast", "--threads", "8", "-e", "1e-3",
        ])
        .unwrap();

        match cli.command {
            Commands::Search { ref query, tool, reconcile, .. } => {
                assert_eq!(query, &PathBuf::from("contigs.fa"));
                assert_eq!(tool, SearchTool::Ublast);
                assert!(!reconcile);
            },
            other => panic!("unexpected command {:?}", other),
        }

        let mut config = Config::default();
        cli.overrides.apply(&mut config);
        assert_eq!(config.aligner.threads, 8);
        assert_eq!(config.pipeline.evalue_threshold, 1e-3);
        assert_eq!(config.pipeline.gene_table, "Genes");
    }

    #[test]
    fn test_search_tool_defaults_to_ublast() {
        let cli = Cli::try_parse_from(["kiwi", "search", "contigs.fa"]).unwrap();
        assert!(matches!(cli.command, Commands::Search { tool: SearchTool::Ublast, .. }));

        let cli = Cli::try_parse_from(["kiwi", "search", "contigs.fa", "--tool", "blast"]).unwrap();
        assert!(matches!(cli.command, Commands::Search { tool: SearchTool::Blast, .. }));

        let cli = Cli::try_parse_from(["kiwi", "makedb"]).unwrap();
        assert!(matches!(cli.command, Commands::Makedb { tool: SearchTool::Ublast, .. }));
    }

    #[test]
    fn test_parse_update_stage() {
        let cli = Cli::try_parse_from(["kiwi", "update", "viral.gbff.gz", "--from", "extract"]).unwrap();
        assert!(matches!(cli.command, Commands::Update { from: UpdateStage::Extract, .. }));

        assert!(Cli::try_parse_from(["kiwi", "update", "viral.gbff", "--from", "download"]).is_err());
    }

    #[test]
    fn test_parse_extract_target() {
        let cli = Cli::try_parse_from(["kiwi", "extract", "protein", "-o", "refs"]).unwrap();
        assert!(matches!(cli.command, Commands::Extract { what: ExtractTarget::Protein, .. }));
    }
}
