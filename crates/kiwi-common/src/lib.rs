//! Kiwi Common Library
//!
//! Shared error handling and logging for the Kiwi workspace.
//!
//! - **Error Handling**: [`KiwiError`] and the [`Result`] alias used by library code
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Placeholders**: the `"NA"` marker written for values that could not be derived
//!
//! # Example
//!
//! ```no_run
//! use kiwi_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

pub use error::{KiwiError, Result};

/// Placeholder written wherever a value is missing or undefined
/// (absent reference row, zero-length denominator).
pub const NA: &str = "NA";
