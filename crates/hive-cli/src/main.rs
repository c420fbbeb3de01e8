//! HiveWatch CLI binary entrypoint.
//!
//! This is the main entry point for the `hivewatch` command-line tool.

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use hive_cli::cli::{Cli, Commands};
use hive_cli::commands::{CheckCommand, InitConfigCommand, ProfileCommand, WatchCommand};
use hive_cli::input::load_config;
use hive_cli::output::OutputFormat;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    if let Commands::InitConfig(args) = &cli.command {
        InitConfigCommand::new().execute(&mut stdout, args)?;
        return Ok(());
    }

    let config = load_config(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("loading config from {}", path.display()),
        None => "loading default config".to_string(),
    })?;
    debug!(?config, "engine config");

    match &cli.command {
        Commands::Check(args) => {
            CheckCommand::new(&config).execute(&mut stdout, &format, args)?;
        }
        Commands::Watch(args) => {
            WatchCommand::new(&config)
                .execute(&mut stdout, &format, args)
                .await?;
        }
        Commands::Profile(args) => {
            ProfileCommand::new(&config).execute(&mut stdout, &format, args)?;
        }
        Commands::InitConfig(_) => {}
    }

    Ok(())
}
