//! Engine configuration.
//!
//! Configuration is read from TOML:
//!
//! ```toml
//! [lifecycle]
//! notify_on_resolve = true
//!
//! [lifecycle.severity]
//! range_critical_widths = 1.0
//!
//! [scheduler]
//! interval_secs = 300
//!
//! [global_thresholds]
//! temperature_min = 32.0
//! # ...
//! ```
//!
//! Every section is optional and falls back to its defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detector::SeverityPolicy;
use crate::error::{AlertError, Result};
use crate::types::ThresholdLimits;

/// Settings for the alert lifecycle manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Whether notifiers receive resolved events as well as created ones.
    pub notify_on_resolve: bool,
    /// How breach magnitude maps to severity.
    pub severity: SeverityPolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            notify_on_resolve: true,
            severity: SeverityPolicy::default(),
        }
    }
}

/// Settings for the check scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between periodic sweeps.
    pub interval_secs: u64,
    /// Finished check tasks kept for inspection.
    pub max_task_history: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            max_task_history: 100,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lifecycle manager settings.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Global threshold profile to install at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_thresholds: Option<ThresholdLimits>,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AlertError::configuration(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Serialization` if the configuration cannot be encoded.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AlertError::Serialization(e.to_string()))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Configuration` if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        self.lifecycle.severity.validate()?;

        if self.scheduler.interval_secs == 0 {
            return Err(AlertError::configuration(
                "scheduler.interval_secs must be at least 1",
            ));
        }
        if self.scheduler.max_task_history == 0 {
            return Err(AlertError::configuration(
                "scheduler.max_task_history must be at least 1",
            ));
        }

        if let Some(limits) = &self.global_thresholds {
            limits.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlertSeverity;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("failed to write temp file");
        file
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = EngineConfig::from_toml("").expect("should parse empty config");
        assert_eq!(config, EngineConfig::default());
        assert!(config.lifecycle.notify_on_resolve);
        assert_eq!(config.scheduler.interval_secs, 300);
        assert!(config.global_thresholds.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [lifecycle]
            notify_on_resolve = false

            [lifecycle.severity]
            battery_critical_fraction = 0.25

            [[lifecycle.severity.bands]]
            min_deviation = 0.0
            severity = "low"

            [[lifecycle.severity.bands]]
            min_deviation = 0.5
            severity = "high"

            [scheduler]
            interval_secs = 60
            max_task_history = 10

            [global_thresholds]
            temperature_min = 30.0
            temperature_max = 36.0
            humidity_min = 45.0
            humidity_max = 65.0
            weight_change_threshold = 1.5
            sound_level_threshold = 80.0
            battery_warning_level = 25.0
            inspection_reminder_days = 10
        "#;

        let config = EngineConfig::from_toml(toml).expect("should parse full config");

        assert!(!config.lifecycle.notify_on_resolve);
        let severity = &config.lifecycle.severity;
        assert_eq!(severity.bands.len(), 2);
        assert_eq!(severity.bands[1].severity, AlertSeverity::High);
        assert!((severity.battery_critical_fraction - 0.25).abs() < f64::EPSILON);
        assert!((severity.scalar_critical_multiple - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.scheduler.interval_secs, 60);
        assert_eq!(config.scheduler.max_task_history, 10);

        let limits = config.global_thresholds.expect("global thresholds");
        assert!((limits.temperature_min - 30.0).abs() < f64::EPSILON);
        assert_eq!(limits.inspection_reminder_days, 10);
    }

    #[test]
    fn load_from_file() {
        let file = create_temp_config("[scheduler]\ninterval_secs = 15\n");
        let config = EngineConfig::from_file(file.path()).expect("should load from file");
        assert_eq!(config.scheduler.interval_secs, 15);
        assert_eq!(config.scheduler.max_task_history, 100);
    }

    #[test]
    fn file_not_found() {
        let result = EngineConfig::from_file("/nonexistent/path/hivewatch.toml");
        assert!(matches!(result, Err(AlertError::Configuration { .. })));
    }

    #[test]
    fn invalid_toml_rejected() {
        let result = EngineConfig::from_toml("[scheduler\ninterval_secs = ");
        assert!(matches!(result, Err(AlertError::Configuration { .. })));
    }

    #[test]
    fn zero_interval_rejected() {
        let result = EngineConfig::from_toml("[scheduler]\ninterval_secs = 0\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("interval_secs"));
    }

    #[test]
    fn invalid_policy_rejected() {
        let toml = r#"
            [[lifecycle.severity.bands]]
            min_deviation = 0.2
            severity = "low"
        "#;
        assert!(EngineConfig::from_toml(toml).is_err());
    }

    #[test]
    fn invalid_global_thresholds_rejected() {
        let config = EngineConfig {
            global_thresholds: Some(ThresholdLimits {
                temperature_min: 40.0,
                temperature_max: 30.0,
                ..ThresholdLimits::default()
            }),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rendered_defaults_parse_back() {
        let config = EngineConfig {
            global_thresholds: Some(ThresholdLimits::default()),
            ..EngineConfig::default()
        };
        let rendered = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&rendered).unwrap(), config);
    }
}
