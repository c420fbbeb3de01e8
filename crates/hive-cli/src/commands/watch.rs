//! Periodic threshold checks over a samples file.
//!
//! The file is re-read at the start of every sweep, so readings appended by
//! another process show up on the next tick. Alert events are printed as they
//! happen; the ledger lives for the duration of the command, so a condition
//! that stays in breach is reported once.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use hive_alerts::{
    AlertLedger, AlertLifecycleManager, ChannelNotifier, CheckScheduler, EngineConfig,
};
use tracing::{info, warn};

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::input::{build_store, SampleFileSource};
use crate::output::OutputFormat;

/// Handler for `watch`.
pub struct WatchCommand<'a> {
    config: &'a EngineConfig,
}

impl<'a> WatchCommand<'a> {
    /// Creates a new watch command handler.
    #[must_use]
    pub const fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Checks on an interval until Ctrl-C or the requested duration elapses.
    ///
    /// Returns the number of alert events printed.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs are invalid, the periodic task cannot be
    /// started, or writing an event fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &WatchArgs,
    ) -> Result<usize, CliError> {
        let interval = args.interval.unwrap_or(self.config.scheduler.interval_secs);
        if interval == 0 {
            return Err(CliError::InvalidArgument(
                "interval must be at least 1 second".to_string(),
            ));
        }

        let store = build_store(self.config, args.input.profiles.as_deref())?;
        let source = Arc::new(SampleFileSource::open(&args.input.samples)?);

        let manager = AlertLifecycleManager::with_config(
            Arc::new(store),
            AlertLedger::new(),
            self.config.lifecycle.clone(),
        );
        let (notifier, mut events) = ChannelNotifier::new("watch");
        manager.add_notifier(Box::new(notifier));

        let scheduler = CheckScheduler::with_config(
            manager,
            Arc::clone(&source),
            Arc::clone(&source),
            self.config.scheduler.clone(),
        );
        let handle = scheduler.spawn_periodic(Duration::from_secs(interval))?;
        info!(path = %source.path().display(), interval_secs = interval, "watching samples file");

        let stop = async {
            match args.duration {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "failed to listen for Ctrl-C");
                    }
                }
            }
        };
        tokio::pin!(stop);

        let mut printed = 0;
        loop {
            tokio::select! {
                () = &mut stop => break,
                event = events.recv() => match event {
                    Some(event) => {
                        format.write_line(out, &event)?;
                        printed += 1;
                    }
                    None => break,
                },
            }
        }

        handle.abort();
        while let Ok(event) = events.try_recv() {
            format.write_line(out, &event)?;
            printed += 1;
        }

        let ledger = scheduler.manager().ledger();
        info!(
            events = printed,
            active = ledger.active_count(),
            checks = scheduler.tasks().len(),
            "stopped watching"
        );
        Ok(printed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    use hive_alerts::AlertEvent;
    use tempfile::NamedTempFile;

    use crate::cli::{Format, InputArgs};

    fn samples_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "hives": [ {{ "hive_id": "hive-1", "samples": [
                {{ "battery_level": 5.0, "recorded_at": "2026-10-16T08:00:00Z" }}
            ] }} ] }}"#
        )
        .unwrap();
        file
    }

    fn args(file: &NamedTempFile, interval: Option<u64>) -> WatchArgs {
        WatchArgs {
            input: InputArgs {
                samples: file.path().to_path_buf(),
                profiles: None,
            },
            interval,
            duration: Some(1),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reports_each_condition_once() {
        let file = samples_file();
        let config = EngineConfig::default();
        let format = OutputFormat::new(Format::Json);
        let mut buf = Vec::new();

        let printed = WatchCommand::new(&config)
            .execute(&mut buf, &format, &args(&file, Some(1)))
            .await
            .unwrap();

        assert_eq!(printed, 1);
        let line = String::from_utf8(buf).unwrap();
        let event: AlertEvent = serde_json::from_str(line.trim()).unwrap();
        assert!(matches!(event, AlertEvent::Created(_)));
        assert_eq!(event.alert().hive_id.as_str(), "hive-1");
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let file = samples_file();
        let config = EngineConfig::default();
        let err = WatchCommand::new(&config)
            .execute(&mut Vec::new(), &OutputFormat::default(), &args(&file, Some(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn missing_samples_file_fails_fast() {
        let config = EngineConfig::default();
        let args = WatchArgs {
            input: InputArgs {
                samples: "/nonexistent/samples.json".into(),
                profiles: None,
            },
            interval: Some(1),
            duration: Some(1),
        };
        let err = WatchCommand::new(&config)
            .execute(&mut Vec::new(), &OutputFormat::default(), &args)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Input(_)));
    }
}
