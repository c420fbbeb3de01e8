//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// HiveWatch CLI - hive threshold checks and alerts.
#[derive(Parser, Debug, Clone)]
#[command(name = "hivewatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration file (TOML).
    #[arg(short, long, env = "HIVEWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one threshold check over a samples file.
    Check(CheckArgs),

    /// Keep checking a samples file on an interval, printing alert events.
    Watch(WatchArgs),

    /// Show the threshold profile that applies to a hive.
    Profile(ProfileArgs),

    /// Write a configuration file with every default spelled out.
    InitConfig(InitConfigArgs),
}

/// Inputs shared by commands that evaluate samples.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// JSON file with hives and their samples.
    #[arg(short, long)]
    pub samples: PathBuf,

    /// JSON file with global and per-hive threshold limits.
    #[arg(short, long)]
    pub profiles: Option<PathBuf>,
}

/// Arguments for `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Sample and profile inputs.
    #[command(flatten)]
    pub input: InputArgs,

    /// Only check this hive.
    #[arg(long)]
    pub hive: Option<String>,
}

/// Arguments for `watch`.
#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Sample and profile inputs.
    #[command(flatten)]
    pub input: InputArgs,

    /// Seconds between checks. Defaults to the configured interval.
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    pub duration: Option<u64>,
}

/// Arguments for `profile`.
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Hive to resolve thresholds for.
    pub hive: String,

    /// JSON file with global and per-hive threshold limits.
    #[arg(short, long)]
    pub profiles: Option<PathBuf>,
}

/// Arguments for `init-config`.
#[derive(Args, Debug, Clone)]
pub struct InitConfigArgs {
    /// Where to write the file. Prints to stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}
