//! Error types for the hive-alerts crate.

use thiserror::Error;

use crate::types::{AlertId, AlertType, HiveId};

/// Errors that can occur in the alert engine.
#[derive(Debug, Error)]
pub enum AlertError {
    /// A threshold profile, severity policy, or config file is malformed.
    #[error("configuration error: {reason}")]
    Configuration {
        /// The reason the configuration was rejected.
        reason: String,
    },

    /// An unresolved alert already exists for the hive and alert type.
    #[error("active {alert_type} alert already exists for hive {hive_id}: {existing}")]
    Conflict {
        /// The hive the alert was raised for.
        hive_id: HiveId,
        /// The alert type that is already active.
        alert_type: AlertType,
        /// The ID of the alert that is already active.
        existing: AlertId,
    },

    /// Alert with the given ID was not found.
    #[error("alert not found: {id}")]
    NotFound {
        /// The alert ID that was not found.
        id: String,
    },

    /// The alert has already been resolved.
    #[error("alert already resolved: {id}")]
    AlreadyResolved {
        /// The alert ID that was resolved twice.
        id: AlertId,
    },

    /// The threshold source failed while looking up a profile.
    #[error("threshold lookup failed for hive {hive_id}: {reason}")]
    ThresholdLookup {
        /// The hive whose profile could not be resolved.
        hive_id: HiveId,
        /// The reason the lookup failed.
        reason: String,
    },

    /// The sample source or hive directory cannot be reached.
    #[error("source unavailable: {reason}")]
    SourceUnavailable {
        /// The reason the source is unavailable.
        reason: String,
    },

    /// A hive identifier was rejected.
    #[error("invalid hive id: {reason}")]
    InvalidHiveId {
        /// The reason the identifier is invalid.
        reason: String,
    },

    /// Scheduled check with the given ID was not found.
    #[error("check task not found: {id}")]
    TaskNotFound {
        /// The task ID that was not found.
        id: String,
    },

    /// A scheduled check attempted an illegal state change.
    #[error("invalid task transition: {from} -> {to}")]
    InvalidTransition {
        /// The current state.
        from: String,
        /// The requested state.
        to: String,
    },

    /// The scheduler could not run a check.
    #[error("scheduler error: {reason}")]
    Scheduler {
        /// The reason the scheduler failed.
        reason: String,
    },

    /// Event delivery to a notifier failed.
    #[error("notification failed: {reason}")]
    Notification {
        /// The reason the notification failed.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl AlertError {
    /// Creates a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns true if the error reflects a caller mistake rather than a
    /// transient fault.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::Conflict { .. }
                | Self::NotFound { .. }
                | Self::AlreadyResolved { .. }
                | Self::InvalidHiveId { .. }
                | Self::TaskNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for AlertError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration {
            reason: format!("invalid TOML: {err}"),
        }
    }
}

/// Result type for alert engine operations.
pub type Result<T> = std::result::Result<T, AlertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_configuration() {
        let err = AlertError::configuration("temperature_min must be below temperature_max");
        assert_eq!(
            err.to_string(),
            "configuration error: temperature_min must be below temperature_max"
        );
    }

    #[test]
    fn error_display_conflict() {
        let existing = AlertId::new();
        let err = AlertError::Conflict {
            hive_id: HiveId::new("hive-7").unwrap(),
            alert_type: AlertType::Temperature,
            existing: existing.clone(),
        };
        assert_eq!(
            err.to_string(),
            format!("active temperature alert already exists for hive hive-7: {existing}")
        );
    }

    #[test]
    fn error_display_not_found() {
        let err = AlertError::NotFound {
            id: "abc-123".to_string(),
        };
        assert_eq!(err.to_string(), "alert not found: abc-123");
    }

    #[test]
    fn error_display_threshold_lookup() {
        let err = AlertError::ThresholdLookup {
            hive_id: HiveId::new("hive-b").unwrap(),
            reason: "connection reset".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "threshold lookup failed for hive hive-b: connection reset"
        );
    }

    #[test]
    fn error_display_invalid_transition() {
        let err = AlertError::InvalidTransition {
            from: "completed".to_string(),
            to: "running".to_string(),
        };
        assert_eq!(err.to_string(), "invalid task transition: completed -> running");
    }

    #[test]
    fn caller_errors_are_classified() {
        assert!(AlertError::configuration("bad").is_caller_error());
        assert!(
            AlertError::NotFound {
                id: "x".to_string()
            }
            .is_caller_error()
        );
        assert!(
            !AlertError::SourceUnavailable {
                reason: "down".to_string()
            }
            .is_caller_error()
        );
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("invalid json");
        assert!(json_err.is_err());
        let alert_err: AlertError = json_err.unwrap_err().into();
        assert!(matches!(alert_err, AlertError::Serialization(_)));
    }

    #[test]
    fn error_from_toml() {
        let toml_err = toml::from_str::<toml::Value>("= broken");
        assert!(toml_err.is_err());
        let alert_err: AlertError = toml_err.unwrap_err().into();
        assert!(matches!(alert_err, AlertError::Configuration { .. }));
    }
}
