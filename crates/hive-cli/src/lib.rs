//! # hive-cli
//!
//! HiveWatch command-line interface.
//!
//! Provides commands for:
//! - One-shot threshold checks over recorded sensor samples
//! - Watching a samples file and printing alert events as they happen
//! - Showing which threshold profile applies to a hive
//! - Writing a starter configuration file
//!
//! # Inputs
//!
//! Samples and threshold profiles are read from JSON files (see [`input`]).
//! Engine settings come from an optional TOML file, the same format
//! [`hive_alerts::EngineConfig`] reads.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod input;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use error::CliError;
pub use input::{ProfileFile, SampleFile, SampleFileSource};
pub use output::{OutputFormat, TableDisplay};
