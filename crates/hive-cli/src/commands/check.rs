//! One-shot threshold check.

use std::io::Write;
use std::sync::Arc;

use hive_alerts::{
    AlertLedger, AlertLifecycleManager, CheckScheduler, EngineConfig, EvaluationResult, HiveId,
    LogNotifier, SweepStatus,
};
use tracing::info;

use crate::cli::CheckArgs;
use crate::error::CliError;
use crate::input::{build_store, SampleFile};
use crate::output::OutputFormat;

/// Handler for `check`.
pub struct CheckCommand<'a> {
    config: &'a EngineConfig,
}

impl<'a> CheckCommand<'a> {
    /// Creates a new check command handler.
    #[must_use]
    pub const fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Runs the check and prints the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs are invalid, or if every examined hive
    /// failed. The result is printed either way.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &CheckArgs,
    ) -> Result<(), CliError> {
        let result = self.run(args)?;
        format.write(out, &result)?;

        if result.status() == SweepStatus::Failed {
            return Err(CliError::Command(format!(
                "all {} examined hive(s) failed",
                result.hives_examined
            )));
        }
        Ok(())
    }

    /// Runs the check without printing.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs cannot be loaded or the hive ID is invalid.
    pub fn run(&self, args: &CheckArgs) -> Result<EvaluationResult, CliError> {
        let hive_id = args
            .hive
            .as_deref()
            .map(HiveId::new)
            .transpose()
            .map_err(|e| CliError::InvalidArgument(e.to_string()))?;

        let store = build_store(self.config, args.input.profiles.as_deref())?;
        let (source, directory) = SampleFile::from_file(&args.input.samples)?.into_sources();

        let manager = AlertLifecycleManager::with_config(
            Arc::new(store),
            AlertLedger::new(),
            self.config.lifecycle.clone(),
        );
        manager.add_notifier(Box::new(LogNotifier::default()));

        let scheduler = CheckScheduler::with_config(
            manager,
            Arc::new(source),
            Arc::new(directory),
            self.config.scheduler.clone(),
        );
        let result = scheduler.check_now(hive_id.as_ref())?;
        info!(
            hives = result.hives_examined,
            created = result.alerts_created.len(),
            failed = result.failures.len(),
            "threshold check finished"
        );
        Ok(result)
    }
}
