//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`check`] - One-shot threshold check over a samples file
//! - [`watch`] - Periodic checks with live alert events
//! - [`profile`] - Effective threshold profile for a hive
//! - [`init_config`] - Configuration scaffolding

pub mod check;
pub mod init_config;
pub mod profile;
pub mod watch;

pub use check::CheckCommand;
pub use init_config::InitConfigCommand;
pub use profile::ProfileCommand;
pub use watch::WatchCommand;
