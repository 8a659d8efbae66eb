//! External aligner invocation
//!
//! Command lines for BLAST+ and usearch, and a runner that reports whether
//! the process could not start, exited non-zero, or succeeded.

use crate::config::AlignerConfig;
use kiwi_common::{KiwiError, Result};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Nucleotide reference FASTA, also the BLAST nucleotide database name
pub const NUCLEOTIDE_REFERENCE: &str = "viralRefSeq.fna";

/// Protein reference FASTA with `>accession-proteinID` headers
pub const PROTEIN_REFERENCE: &str = "viralRefProt.faa";

pub const NUCLEOTIDE_UDB: &str = "viralRefSeq.udb";
pub const PROTEIN_UDB: &str = "viralRefProt.udb";

/// Cutoff passed to the aligners themselves
const ALIGNER_EVALUE: &str = "1e-5";

/// Which aligner family runs the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTool {
    Blast,
    Ublast,
}

impl SearchTool {
    /// Output file name of the protein-stage search
    pub fn protein_output(self) -> &'static str {
        match self {
            SearchTool::Blast => "blastx.outfmt6",
            SearchTool::Ublast => "ublastX.outfmt6",
        }
    }

    /// Output file name of the nucleotide-stage search
    pub fn nucleotide_output(self) -> &'static str {
        match self {
            SearchTool::Blast => "blastn.outfmt6",
            SearchTool::Ublast => "ublastN.outfmt6",
        }
    }
}

impl std::str::FromStr for SearchTool {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blast" => Ok(SearchTool::Blast),
            "ublast" | "usearch" => Ok(SearchTool::Ublast),
            _ => Err(anyhow::anyhow!("Invalid search tool: {} (expected blast or ublast)", s)),
        }
    }
}

/// Outcome of a process that was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Succeeded,
    /// Exit code, or `None` when killed by a signal
    ExitedNonZero(Option<i32>),
}

impl ProcessOutcome {
    pub fn succeeded(self) -> bool {
        self == ProcessOutcome::Succeeded
    }

    /// Turn a non-zero exit into [`KiwiError::ProcessFailed`]
    pub fn into_result(self, program: &str) -> Result<()> {
        match self {
            ProcessOutcome::Succeeded => Ok(()),
            ProcessOutcome::ExitedNonZero(code) => Err(KiwiError::ProcessFailed {
                program: program.to_string(),
                code,
            }),
        }
    }
}

/// Clamp a requested thread count to the cores available
pub fn cap_threads(requested: usize) -> usize {
    let available = std::thread::available_parallelism().map_or(1, |n| n.get());
    requested.clamp(1, available)
}

/// A fully built external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl AlignerCommand {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(|a| a.as_ref().to_os_string()).collect(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Short name used in logs and errors
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Run to completion with inherited stdout/stderr
    pub async fn run(&self) -> Result<ProcessOutcome> {
        info!(command = %self, "Running external command");
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| KiwiError::ProcessSpawn {
                program: self.name(),
                source,
            })?;

        if status.success() {
            debug!(program = %self.name(), "Command finished");
            Ok(ProcessOutcome::Succeeded)
        } else {
            warn!(program = %self.name(), code = ?status.code(), "Command exited with failure");
            Ok(ProcessOutcome::ExitedNonZero(status.code()))
        }
    }

    /// Run and treat a non-zero exit as an error
    pub async fn run_checked(&self) -> Result<()> {
        let name = self.name();
        self.run().await?.into_result(&name)
    }
}

impl fmt::Display for AlignerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Builds aligner command lines from configured tool locations
#[derive(Debug, Clone)]
pub struct Aligners {
    usearch: PathBuf,
    blast_bin_dir: Option<PathBuf>,
    threads: usize,
}

impl Aligners {
    pub fn new(config: &AlignerConfig) -> Self {
        let threads = cap_threads(config.threads);
        if threads < config.threads {
            warn!(requested = config.threads, using = threads, "Reducing aligner threads to available cores");
        }
        Self {
            usearch: config.usearch_path.clone(),
            blast_bin_dir: config.blast_bin_dir.clone(),
            threads,
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    fn blast(&self, program: &str) -> PathBuf {
        match &self.blast_bin_dir {
            Some(dir) => dir.join(program),
            None => PathBuf::from(program),
        }
    }

    /// Protein-stage search of `query` against the protein reference
    pub fn protein_search(&self, tool: SearchTool, query: &Path, dbdir: &Path, out: &Path) -> AlignerCommand {
        match tool {
            SearchTool::Blast => AlignerCommand::new(
                self.blast("blastx"),
                [
                    OsStr::new("-query"),
                    query.as_os_str(),
                    OsStr::new("-db"),
                    dbdir.join(PROTEIN_REFERENCE).as_os_str(),
                    OsStr::new("-num_threads"),
                    OsStr::new(&self.threads.to_string()),
                    OsStr::new("-max_target_seqs"),
                    OsStr::new("1"),
                    OsStr::new("-outfmt"),
                    OsStr::new("6"),
                    OsStr::new("-evalue"),
                    OsStr::new("0.00001"),
                    OsStr::new("-out"),
                    out.as_os_str(),
                ],
            ),
            SearchTool::Ublast => self.ublast(query, &dbdir.join(PROTEIN_UDB), out, false),
        }
    }

    /// Nucleotide-stage search of `query` against the nucleotide reference
    pub fn nucleotide_search(&self, tool: SearchTool, query: &Path, dbdir: &Path, out: &Path) -> AlignerCommand {
        match tool {
            SearchTool::Blast => AlignerCommand::new(
                self.blast("blastn"),
                [
                    OsStr::new("-query"),
                    query.as_os_str(),
                    OsStr::new("-db"),
                    dbdir.join(NUCLEOTIDE_REFERENCE).as_os_str(),
                    OsStr::new("-num_threads"),
                    OsStr::new(&self.threads.to_string()),
                    OsStr::new("-max_target_seqs"),
                    OsStr::new("1"),
                    OsStr::new("-outfmt"),
                    OsStr::new("6"),
                    OsStr::new("-out"),
                    out.as_os_str(),
                ],
            ),
            SearchTool::Ublast => self.ublast(query, &dbdir.join(NUCLEOTIDE_UDB), out, true),
        }
    }

    fn ublast(&self, query: &Path, db: &Path, out: &Path, both_strands: bool) -> AlignerCommand {
        let threads = self.threads.to_string();
        let mut args: Vec<&OsStr> = vec![
            OsStr::new("-ublast"),
            query.as_os_str(),
            OsStr::new("-db"),
            db.as_os_str(),
            OsStr::new("-evalue"),
            OsStr::new(ALIGNER_EVALUE),
            OsStr::new("-maxaccepts"),
            OsStr::new("1"),
            OsStr::new("-maxrejects"),
            OsStr::new("5"),
            OsStr::new("-threads"),
            OsStr::new(&threads),
        ];
        if both_strands {
            args.extend([OsStr::new("-strand"), OsStr::new("both")]);
        }
        args.extend([OsStr::new("-blast6out"), out.as_os_str()]);
        AlignerCommand::new(&self.usearch, args)
    }

    /// Commands that index both reference FASTA files in `dbdir`
    pub fn database_builds(&self, tool: SearchTool, dbdir: &Path) -> Vec<AlignerCommand> {
        let nucleotide = dbdir.join(NUCLEOTIDE_REFERENCE);
        let protein = dbdir.join(PROTEIN_REFERENCE);
        match tool {
            SearchTool::Blast => [(nucleotide, "nucl"), (protein, "prot")]
                .into_iter()
                .map(|(input, dbtype)| {
                    AlignerCommand::new(
                        self.blast("makeblastdb"),
                        [
                            OsStr::new("-in"),
                            input.as_os_str(),
                            OsStr::new("-parse_seqids"),
                            OsStr::new("-dbtype"),
                            OsStr::new(dbtype),
                        ],
                    )
                })
                .collect(),
            SearchTool::Ublast => [(nucleotide, NUCLEOTIDE_UDB), (protein, PROTEIN_UDB)]
                .into_iter()
                .map(|(input, udb)| {
                    AlignerCommand::new(
                        &self.usearch,
                        [
                            OsStr::new("-makeudb_ublast"),
                            input.as_os_str(),
                            OsStr::new("-output"),
                            dbdir.join(udb).as_os_str(),
                        ],
                    )
                })
                .collect(),
        }
    }
}
