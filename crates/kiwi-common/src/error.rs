//! Error types for Kiwi
//!
//! Only conditions that end a run live here. Per-unit problems (a bad flat-file
//! record, a short alignment line, a missing reference row) are recovered where
//! they occur and counted in the run summary instead.

use thiserror::Error;

/// Result type alias for Kiwi operations
pub type Result<T> = std::result::Result<T, KiwiError>;

/// Main error type for Kiwi
#[derive(Error, Debug)]
pub enum KiwiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid table name '{0}': only ASCII letters, digits and '_' are allowed")]
    InvalidTable(String),

    /// The executable could not be launched at all
    #[error("Failed to start '{program}': {source}")]
    ProcessSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The executable ran but reported failure
    #[error("'{program}' exited with status {}", code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    ProcessFailed { program: String, code: Option<i32> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_failed_message() {
        let err = KiwiError::ProcessFailed {
            program: "blastn".to_string(),
            code: Some(2),
        };
        assert_eq!(err.to_string(), "'blastn' exited with status 2");

        let err = KiwiError::ProcessFailed {
            program: "usearch".to_string(),
            code: None,
        };
        assert_eq!(err.to_string(), "'usearch' exited with status signal");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.gbff");
        let err: KiwiError = io.into();
        assert!(matches!(err, KiwiError::Io(_)));
    }
}
