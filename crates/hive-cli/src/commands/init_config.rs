//! Configuration scaffolding.

use std::io::Write;

use hive_alerts::{EngineConfig, ThresholdLimits};

use crate::cli::InitConfigArgs;
use crate::error::CliError;

/// Handler for `init-config`.
#[derive(Debug, Default)]
pub struct InitConfigCommand;

impl InitConfigCommand {
    /// Creates a new init-config command handler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns the configuration that gets written: every default, with the
    /// built-in limits as the global profile.
    #[must_use]
    pub fn template() -> EngineConfig {
        EngineConfig {
            global_thresholds: Some(ThresholdLimits::default()),
            ..EngineConfig::default()
        }
    }

    /// Writes the template to a file, or to `out` when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and `--force` is not set, or if
    /// writing fails.
    pub fn execute<W: Write>(&self, out: &mut W, args: &InitConfigArgs) -> Result<(), CliError> {
        let content = Self::template().to_toml()?;

        match &args.output {
            Some(path) => {
                if path.exists() && !args.force {
                    return Err(CliError::InvalidArgument(format!(
                        "'{}' already exists (use --force to overwrite)",
                        path.display()
                    )));
                }
                std::fs::write(path, content)?;
                writeln!(out, "Config written to {}", path.display())?;
                writeln!(out)?;
                writeln!(out, "Run a check with:")?;
                writeln!(
                    out,
                    "  hivewatch --config {} check --samples samples.json",
                    path.display()
                )?;
            }
            None => out.write_all(content.as_bytes())?,
        }
        Ok(())
    }
}
