//! Logging setup shared by the Kiwi binaries
//!
//! Library code logs through `tracing` with structured fields:
//!
//! ```rust,ignore
//! info!(accession = %record.accession, genes = record.genes.len(), "Uploaded record");
//! warn!(line = line_no, reason = %reason, "Skipping alignment line");
//! ```
//!
//! The chosen level applies to the `kiwi_*` crates; third-party crates only
//! report warnings unless extra directives say otherwise. Lines go to stderr,
//! to a daily-rotated file, or both, as text or JSON. Stdout is left to the
//! command's own summary.
//!
//! # Example
//!
//! ```no_run
//! use kiwi_common::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig::for_cli(true).merge_env()?;
//! let _guard = init_logging(&config)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Crates whose events follow the configured level
const KIWI_CRATES: [&str; 3] = ["kiwi_common", "kiwi_ingest", "kiwi_cli"];

/// Match `s` case-insensitively against a keyword table
fn keyword<T: Copy>(kind: &str, s: &str, table: &[(&str, T)]) -> Result<T> {
    let wanted = s.trim().to_ascii_lowercase();
    table
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, value)| *value)
        .ok_or_else(|| anyhow!("Invalid log {}: {}", kind, s))
}

/// Where log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

impl FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        keyword(
            "output",
            s,
            &[
                ("console", LogOutput::Console),
                ("stderr", LogOutput::Console),
                ("file", LogOutput::File),
                ("both", LogOutput::Both),
            ],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        keyword("format", s, &[("text", LogFormat::Text), ("json", LogFormat::Json)])
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub output: LogOutput,
    pub format: LogFormat,
    /// Directory of the rotated files when output includes a file
    pub log_dir: PathBuf,
    /// "kiwi" gives files named "kiwi.2017-09-11"
    pub log_file_prefix: String,
    /// Extra `EnvFilter` directives, e.g. "sqlx=info"
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            output: LogOutput::Console,
            format: LogFormat::Text,
            log_dir: PathBuf::from("logs"),
            log_file_prefix: "kiwi".to_string(),
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }

    /// Console logging at info, or debug when `verbose`
    pub fn for_cli(verbose: bool) -> Self {
        let level = if verbose { Level::DEBUG } else { Level::INFO };
        Self::builder().level(level).build()
    }

    /// Defaults overlaid with `LOG_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    /// Overlay `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR` and `LOG_FILTER`
    pub fn merge_env(mut self) -> Result<Self> {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        if let Some(level) = var("LOG_LEVEL") {
            self.level = level
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid log level: {}", level))?;
        }
        if let Some(output) = var("LOG_OUTPUT") {
            self.output = output.parse()?;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.format = format.parse()?;
        }
        if let Some(dir) = var("LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(filter) = var("LOG_FILTER") {
            self.directives.extend(filter.split(',').map(|d| d.trim().to_string()));
        }
        Ok(self)
    }

    /// Filter string: warn globally, the configured level for Kiwi crates,
    /// then any extra directives
    pub fn filter_spec(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        std::iter::once("warn".to_string())
            .chain(KIWI_CRATES.iter().map(|krate| format!("{}={}", krate, level)))
            .chain(self.directives.iter().filter(|d| !d.is_empty()).cloned())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let spec = self.filter_spec();
        EnvFilter::try_new(&spec).with_context(|| format!("Invalid log filter '{}'", spec))
    }
}

#[derive(Debug, Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: Level) -> Self {
        self.config.level = level;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    pub fn log_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.log_file_prefix = prefix.into();
        self
    }

    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.config.directives.push(directive.into());
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn formatted<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_target(false).with_ansi(ansi);
    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Install the global subscriber
///
/// With file output the returned guard must outlive the run, or the last
/// buffered lines are dropped.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = config.env_filter()?;
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if matches!(config.output, LogOutput::Console | LogOutput::Both) {
        layers.push(formatted(config.format, std::io::stderr, true));
    }

    if matches!(config.output, LogOutput::File | LogOutput::Both) {
        std::fs::create_dir_all(&config.log_dir)
            .with_context(|| format!("Failed to create log directory {}", config.log_dir.display()))?;
        let (writer, file_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix));
        layers.push(formatted(config.format, writer, false));
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Logging was already initialized")?;

    Ok(guard)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_parse() {
        assert_eq!("Both".parse::<LogOutput>().unwrap(), LogOutput::Both);
        assert_eq!("stderr".parse::<LogOutput>().unwrap(), LogOutput::Console);
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("syslog".parse::<LogOutput>().is_err());
    }

    #[test]
    fn test_cli_preset() {
        assert_eq!(LogConfig::for_cli(true).level, Level::DEBUG);
        assert_eq!(LogConfig::for_cli(false).level, Level::INFO);
        assert_eq!(LogConfig::for_cli(false).output, LogOutput::Console);
    }

    #[test]
    fn test_filter_scopes_level_to_kiwi_crates() {
        let config = LogConfig::builder()
            .level(Level::DEBUG)
            .directive("sqlx=info")
            .build();
        assert_eq!(
            config.filter_spec(),
            "warn,kiwi_common=debug,kiwi_ingest=debug,kiwi_cli=debug,sqlx=info"
        );
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn test_bad_directive_is_rejected() {
        let config = LogConfig::builder().directive("kiwi_ingest=verbose").build();
        assert!(config.env_filter().is_err());
    }
}
