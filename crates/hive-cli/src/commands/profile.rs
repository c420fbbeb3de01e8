//! Effective threshold profile lookup.

use std::io::Write;
use std::sync::Arc;

use hive_alerts::{EngineConfig, HiveId, ThresholdProfile, ThresholdResolver};

use crate::cli::ProfileArgs;
use crate::error::CliError;
use crate::input::build_store;
use crate::output::OutputFormat;

/// Handler for `profile`.
pub struct ProfileCommand<'a> {
    config: &'a EngineConfig,
}

impl<'a> ProfileCommand<'a> {
    /// Creates a new profile command handler.
    #[must_use]
    pub const fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Prints the profile that applies to the hive.
    ///
    /// # Errors
    ///
    /// Returns an error if the hive ID is invalid or the profiles cannot be loaded.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &ProfileArgs,
    ) -> Result<(), CliError> {
        let profile = self.resolve(args)?;
        format.write(out, &profile)
    }

    /// Resolves the profile without printing.
    ///
    /// # Errors
    ///
    /// Returns an error if the hive ID is invalid or the profiles cannot be loaded.
    pub fn resolve(&self, args: &ProfileArgs) -> Result<ThresholdProfile, CliError> {
        let hive_id =
            HiveId::new(args.hive.as_str()).map_err(|e| CliError::InvalidArgument(e.to_string()))?;
        let store = build_store(self.config, args.profiles.as_deref())?;
        Ok(ThresholdResolver::new(Arc::new(store)).resolve(&hive_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    use hive_alerts::{ProfileScope, ThresholdLimits};
    use tempfile::NamedTempFile;

    fn profiles_file() -> NamedTempFile {
        let limits = serde_json::to_string(&ThresholdLimits {
            sound_level_threshold: 90.0,
            ..ThresholdLimits::default()
        })
        .unwrap();
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "global": {limits}, "hives": {{ "hive-7": {limits} }} }}"#).unwrap();
        file
    }

    fn args(hive: &str, profiles: Option<&NamedTempFile>) -> ProfileArgs {
        ProfileArgs {
            hive: hive.to_string(),
            profiles: profiles.map(|f| f.path().to_path_buf()),
        }
    }

    #[test]
    fn builtin_when_nothing_configured() {
        let config = EngineConfig::default();
        let profile = ProfileCommand::new(&config).resolve(&args("hive-1", None)).unwrap();
        assert_eq!(profile.scope, ProfileScope::BuiltIn);
        assert_eq!(profile.limits, ThresholdLimits::default());
    }

    #[test]
    fn global_from_config() {
        let config = EngineConfig {
            global_thresholds: Some(ThresholdLimits {
                battery_warning_level: 30.0,
                ..ThresholdLimits::default()
            }),
            ..EngineConfig::default()
        };
        let profile = ProfileCommand::new(&config).resolve(&args("hive-1", None)).unwrap();
        assert_eq!(profile.scope, ProfileScope::Global);
        assert_eq!(profile.limits.battery_warning_level, 30.0);
    }

    #[test]
    fn hive_override_from_profiles_file() {
        let file = profiles_file();
        let config = EngineConfig::default();
        let cmd = ProfileCommand::new(&config);

        let overridden = cmd.resolve(&args("hive-7", Some(&file))).unwrap();
        assert!(overridden.is_override());

        let global = cmd.resolve(&args("hive-8", Some(&file))).unwrap();
        assert_eq!(global.scope, ProfileScope::Global);
        assert_eq!(global.limits.sound_level_threshold, 90.0);
    }

    #[test]
    fn blank_hive_is_invalid() {
        let config = EngineConfig::default();
        let err = ProfileCommand::new(&config).resolve(&args("", None)).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
