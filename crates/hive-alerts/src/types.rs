//! Core types for the alert engine.
//!
//! This module provides the data model shared by every component:
//! - [`HiveId`] and [`AlertId`]: identifiers
//! - [`AlertType`] and [`AlertSeverity`]: alert classification
//! - [`ThresholdLimits`] and [`ThresholdProfile`]: the bounds a sample is judged against
//! - [`SensorSample`] and [`Metric`]: one reading from a hive
//! - [`Alert`]: an active or resolved alert instance

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AlertError, Result};

/// Identifier of a monitored hive.
///
/// Hive identity is owned by the hive directory; the engine only requires the
/// identifier to be a non-empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HiveId(String);

impl HiveId {
    /// Maximum allowed length for hive identifiers.
    pub const MAX_LENGTH: usize = 128;

    /// Creates a hive identifier.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidHiveId` if the identifier is blank or too long.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(AlertError::InvalidHiveId {
                reason: "hive id cannot be empty".to_string(),
            });
        }
        if id.len() > Self::MAX_LENGTH {
            return Err(AlertError::InvalidHiveId {
                reason: format!(
                    "hive id exceeds maximum length of {} characters",
                    Self::MAX_LENGTH
                ),
            });
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HiveId {
    type Error = AlertError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<HiveId> for String {
    fn from(id: HiveId) -> Self {
        id.0
    }
}

impl fmt::Display for HiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for an alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(Uuid);

impl AlertId {
    /// Creates a new random alert ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parses an alert ID from a string.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotFound` if the string is not a valid UUID, since
    /// no alert can carry such an ID.
    pub fn parse(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s).map_err(|_| AlertError::NotFound { id: s.to_string() })?;
        Ok(Self(uuid))
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of condition an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    /// Hive temperature out of range.
    Temperature,
    /// Hive humidity out of range.
    Humidity,
    /// Unusual colony activity, such as a sudden weight change.
    Activity,
    /// Sensor battery running low.
    Battery,
    /// Colony health concern.
    Health,
    /// Disturbance at the hive, such as a loud noise.
    Security,
    /// Upkeep reminder, such as an overdue inspection.
    Maintenance,
    /// Anything else.
    Other,
}

impl AlertType {
    /// All alert types in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Temperature,
        Self::Humidity,
        Self::Activity,
        Self::Battery,
        Self::Health,
        Self::Security,
        Self::Maintenance,
        Self::Other,
    ];

    /// Returns the alert type as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Activity => "activity",
            Self::Battery => "battery",
            Self::Health => "health",
            Self::Security => "security",
            Self::Maintenance => "maintenance",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The severity level of an alert, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Slightly outside the configured bound.
    #[default]
    Low,
    /// Noticeably outside the configured bound.
    Medium,
    /// Far outside the configured bound.
    High,
    /// Requires immediate attention.
    Critical,
}

impl AlertSeverity {
    /// All severities in ascending order.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Returns the severity as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single value captured in an alert's trigger payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerValue {
    /// A numeric measurement or bound.
    Number(f64),
    /// A textual annotation.
    Text(String),
}

impl From<f64> for TriggerValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for TriggerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TriggerValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Structured payload describing the measurement that raised an alert.
pub type TriggerValues = BTreeMap<String, TriggerValue>;

/// A sensor metric the detector knows how to judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Temperature in degrees Celsius.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
    /// Weight delta since the previous sample, in kilograms.
    WeightChange,
    /// Sound level in decibels.
    SoundLevel,
    /// Sensor battery level in percent.
    Battery,
}

impl Metric {
    /// Returns the metric name used in trigger payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::WeightChange => "weight_change",
            Self::SoundLevel => "sound_level",
            Self::Battery => "battery_level",
        }
    }

    /// Returns the alert type a breach of this metric raises.
    #[must_use]
    pub const fn alert_type(&self) -> AlertType {
        match self {
            Self::Temperature => AlertType::Temperature,
            Self::Humidity => AlertType::Humidity,
            Self::WeightChange => AlertType::Activity,
            Self::SoundLevel => AlertType::Security,
            Self::Battery => AlertType::Battery,
        }
    }

    /// Returns the display unit for this metric.
    #[must_use]
    pub const fn unit(&self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Humidity | Self::Battery => "%",
            Self::WeightChange => "kg",
            Self::SoundLevel => "dB",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One reading reported by a hive's sensors.
///
/// Every metric is optional since not every device reports every metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Temperature in degrees Celsius.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Relative humidity in percent.
    #[serde(default)]
    pub humidity: Option<f64>,
    /// Weight delta since the previous sample, in kilograms.
    #[serde(default)]
    pub weight_change: Option<f64>,
    /// Sound level in decibels.
    #[serde(default)]
    pub sound_level: Option<f64>,
    /// Battery level in percent.
    #[serde(default)]
    pub battery_level: Option<f64>,
    /// When the sample was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl SensorSample {
    /// Creates an empty sample recorded at the given time.
    #[must_use]
    pub const fn at(recorded_at: DateTime<Utc>) -> Self {
        Self {
            temperature: None,
            humidity: None,
            weight_change: None,
            sound_level: None,
            battery_level: None,
            recorded_at,
        }
    }

    /// Creates an empty sample recorded now.
    #[must_use]
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Sets the temperature reading.
    #[must_use]
    pub const fn with_temperature(mut self, value: f64) -> Self {
        self.temperature = Some(value);
        self
    }

    /// Sets the humidity reading.
    #[must_use]
    pub const fn with_humidity(mut self, value: f64) -> Self {
        self.humidity = Some(value);
        self
    }

    /// Sets the weight change reading.
    #[must_use]
    pub const fn with_weight_change(mut self, value: f64) -> Self {
        self.weight_change = Some(value);
        self
    }

    /// Sets the sound level reading.
    #[must_use]
    pub const fn with_sound_level(mut self, value: f64) -> Self {
        self.sound_level = Some(value);
        self
    }

    /// Sets the battery level reading.
    #[must_use]
    pub const fn with_battery_level(mut self, value: f64) -> Self {
        self.battery_level = Some(value);
        self
    }

    /// Returns the reading for a metric, if the device reported it.
    #[must_use]
    pub const fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::WeightChange => self.weight_change,
            Metric::SoundLevel => self.sound_level,
            Metric::Battery => self.battery_level,
        }
    }
}

/// Numeric bounds a hive's samples are judged against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdLimits {
    /// Lowest acceptable temperature in degrees Celsius.
    pub temperature_min: f64,
    /// Highest acceptable temperature in degrees Celsius.
    pub temperature_max: f64,
    /// Lowest acceptable relative humidity in percent.
    pub humidity_min: f64,
    /// Highest acceptable relative humidity in percent.
    pub humidity_max: f64,
    /// Weight change (either direction) that counts as a breach, in kilograms.
    pub weight_change_threshold: f64,
    /// Sound level that counts as a breach, in decibels.
    pub sound_level_threshold: f64,
    /// Battery level at or below which a warning is raised, in percent.
    pub battery_warning_level: f64,
    /// Days between inspections before a maintenance reminder is raised.
    pub inspection_reminder_days: u32,
}

impl ThresholdLimits {
    /// Built-in lowest acceptable temperature.
    pub const DEFAULT_TEMPERATURE_MIN: f64 = 32.0;
    /// Built-in highest acceptable temperature.
    pub const DEFAULT_TEMPERATURE_MAX: f64 = 38.0;
    /// Built-in lowest acceptable humidity.
    pub const DEFAULT_HUMIDITY_MIN: f64 = 40.0;
    /// Built-in highest acceptable humidity.
    pub const DEFAULT_HUMIDITY_MAX: f64 = 70.0;
    /// Built-in weight change threshold.
    pub const DEFAULT_WEIGHT_CHANGE_THRESHOLD: f64 = 2.0;
    /// Built-in sound level threshold.
    pub const DEFAULT_SOUND_LEVEL_THRESHOLD: f64 = 85.0;
    /// Built-in battery warning level.
    pub const DEFAULT_BATTERY_WARNING_LEVEL: f64 = 20.0;
    /// Built-in inspection reminder interval.
    pub const DEFAULT_INSPECTION_REMINDER_DAYS: u32 = 7;

    /// Validates the limits.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Configuration` if:
    /// - Any value is not finite
    /// - A range minimum is not strictly below its maximum
    /// - A scalar threshold is not positive
    /// - The battery warning level is outside 0..=100
    /// - The inspection reminder is zero days
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("temperature_min", self.temperature_min),
            ("temperature_max", self.temperature_max),
            ("humidity_min", self.humidity_min),
            ("humidity_max", self.humidity_max),
            ("weight_change_threshold", self.weight_change_threshold),
            ("sound_level_threshold", self.sound_level_threshold),
            ("battery_warning_level", self.battery_warning_level),
        ];
        if let Some((name, _)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AlertError::configuration(format!("{name} must be a finite number")));
        }

        if self.temperature_min >= self.temperature_max {
            return Err(AlertError::configuration(format!(
                "temperature_min ({}) must be below temperature_max ({})",
                self.temperature_min, self.temperature_max
            )));
        }
        if self.humidity_min >= self.humidity_max {
            return Err(AlertError::configuration(format!(
                "humidity_min ({}) must be below humidity_max ({})",
                self.humidity_min, self.humidity_max
            )));
        }
        if self.weight_change_threshold <= 0.0 {
            return Err(AlertError::configuration(
                "weight_change_threshold must be positive",
            ));
        }
        if self.sound_level_threshold <= 0.0 {
            return Err(AlertError::configuration(
                "sound_level_threshold must be positive",
            ));
        }
        if !(0.0..=100.0).contains(&self.battery_warning_level) {
            return Err(AlertError::configuration(
                "battery_warning_level must be between 0 and 100",
            ));
        }
        if self.inspection_reminder_days == 0 {
            return Err(AlertError::configuration(
                "inspection_reminder_days must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for ThresholdLimits {
    fn default() -> Self {
        Self {
            temperature_min: Self::DEFAULT_TEMPERATURE_MIN,
            temperature_max: Self::DEFAULT_TEMPERATURE_MAX,
            humidity_min: Self::DEFAULT_HUMIDITY_MIN,
            humidity_max: Self::DEFAULT_HUMIDITY_MAX,
            weight_change_threshold: Self::DEFAULT_WEIGHT_CHANGE_THRESHOLD,
            sound_level_threshold: Self::DEFAULT_SOUND_LEVEL_THRESHOLD,
            battery_warning_level: Self::DEFAULT_BATTERY_WARNING_LEVEL,
            inspection_reminder_days: Self::DEFAULT_INSPECTION_REMINDER_DAYS,
        }
    }
}

/// Which hives a threshold profile applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "hive_id", rename_all = "snake_case")]
pub enum ProfileScope {
    /// Applies to every hive without its own override.
    Global,
    /// Applies to a single hive, replacing the global profile entirely.
    Hive(HiveId),
    /// The built-in fallback used when nothing is configured. Never stored.
    BuiltIn,
}

impl fmt::Display for ProfileScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Hive(id) => write!(f, "hive:{id}"),
            Self::BuiltIn => write!(f, "built-in"),
        }
    }
}

/// A set of threshold limits together with the scope it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    /// Which hives this profile applies to.
    pub scope: ProfileScope,
    /// The configured bounds.
    pub limits: ThresholdLimits,
    /// When the profile was first saved.
    pub created_at: DateTime<Utc>,
    /// When the profile was last saved.
    pub updated_at: DateTime<Utc>,
}

impl ThresholdProfile {
    /// Creates a profile for the given scope, validating its limits.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Configuration` if the limits are invalid.
    pub fn new(scope: ProfileScope, limits: ThresholdLimits) -> Result<Self> {
        limits.validate()?;
        let now = Utc::now();
        Ok(Self {
            scope,
            limits,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns the built-in default profile.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            scope: ProfileScope::BuiltIn,
            limits: ThresholdLimits::default(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Returns true if this profile overrides the global profile for one hive.
    #[must_use]
    pub const fn is_override(&self) -> bool {
        matches!(self.scope, ProfileScope::Hive(_))
    }
}

/// The fields needed to record a new alert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    /// The hive the alert is raised for.
    pub hive_id: HiveId,
    /// The kind of condition.
    pub alert_type: AlertType,
    /// How urgent the condition is.
    pub severity: AlertSeverity,
    /// Human-readable description.
    pub message: String,
    /// The measurement that raised the alert.
    pub trigger_values: TriggerValues,
}

impl NewAlert {
    /// Creates a new alert request with an empty trigger payload.
    #[must_use]
    pub fn new(
        hive_id: HiveId,
        alert_type: AlertType,
        severity: AlertSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            hive_id,
            alert_type,
            severity,
            message: message.into(),
            trigger_values: TriggerValues::new(),
        }
    }

    /// Adds a trigger value.
    #[must_use]
    pub fn trigger(mut self, key: impl Into<String>, value: impl Into<TriggerValue>) -> Self {
        self.trigger_values.insert(key.into(), value.into());
        self
    }

    /// Replaces the trigger payload.
    #[must_use]
    pub fn trigger_values(mut self, values: TriggerValues) -> Self {
        self.trigger_values = values;
        self
    }
}

/// An active or resolved alert instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier for this alert instance.
    pub id: AlertId,
    /// The hive the alert was raised for.
    pub hive_id: HiveId,
    /// The kind of condition.
    pub alert_type: AlertType,
    /// How urgent the condition is.
    pub severity: AlertSeverity,
    /// Human-readable description.
    pub message: String,
    /// The measurement that raised the alert.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub trigger_values: TriggerValues,
    /// When the alert was raised.
    pub created_at: DateTime<Utc>,
    /// Whether the alert has been resolved.
    pub is_resolved: bool,
    /// When the alert was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Who resolved the alert.
    pub resolved_by: Option<String>,
    /// Notes recorded at resolution.
    pub resolution_notes: Option<String>,
}

impl Alert {
    /// Creates a new unresolved alert.
    #[must_use]
    pub fn new(new: NewAlert) -> Self {
        Self {
            id: AlertId::new(),
            hive_id: new.hive_id,
            alert_type: new.alert_type,
            severity: new.severity,
            message: new.message,
            trigger_values: new.trigger_values,
            created_at: Utc::now(),
            is_resolved: false,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
        }
    }

    /// Returns true if the alert has not been resolved.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.is_resolved
    }

    /// Marks the alert resolved.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::AlreadyResolved` if the alert was already resolved.
    pub fn resolve(
        &mut self,
        resolved_by: impl Into<String>,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if self.is_resolved {
            return Err(AlertError::AlreadyResolved {
                id: self.id.clone(),
            });
        }
        self.is_resolved = true;
        self.resolved_at = Some(at);
        self.resolved_by = Some(resolved_by.into());
        self.resolution_notes = notes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod hive_id_tests {
        use super::*;

        #[test]
        fn create_hive_id() {
            let id = HiveId::new("apiary-1/hive-3").unwrap();
            assert_eq!(id.as_str(), "apiary-1/hive-3");
            assert_eq!(id.to_string(), "apiary-1/hive-3");
        }

        #[test]
        fn blank_hive_id_fails() {
            assert!(matches!(
                HiveId::new("   "),
                Err(AlertError::InvalidHiveId { .. })
            ));
        }

        #[test]
        fn long_hive_id_fails() {
            let long = "h".repeat(HiveId::MAX_LENGTH + 1);
            assert!(HiveId::new(long).is_err());
        }

        #[test]
        fn hive_id_deserialize_rejects_empty() {
            let parsed: serde_json::Result<HiveId> = serde_json::from_str("\"\"");
            assert!(parsed.is_err());
        }

        #[test]
        fn hive_id_serializes_as_string() {
            let id = HiveId::new("hive-1").unwrap();
            assert_eq!(serde_json::to_string(&id).unwrap(), "\"hive-1\"");
        }
    }

    mod alert_id_tests {
        use super::*;

        #[test]
        fn ids_are_unique() {
            assert_ne!(AlertId::new(), AlertId::new());
        }

        #[test]
        fn parse_roundtrip() {
            let id = AlertId::new();
            let parsed = AlertId::parse(&id.to_string()).unwrap();
            assert_eq!(parsed, id);
        }

        #[test]
        fn parse_garbage_is_not_found() {
            assert!(matches!(
                AlertId::parse("not-a-uuid"),
                Err(AlertError::NotFound { .. })
            ));
        }
    }

    mod severity_tests {
        use super::*;

        #[test]
        fn severity_is_totally_ordered() {
            assert!(AlertSeverity::Low < AlertSeverity::Medium);
            assert!(AlertSeverity::Medium < AlertSeverity::High);
            assert!(AlertSeverity::High < AlertSeverity::Critical);
            assert_eq!(
                AlertSeverity::ALL.iter().max(),
                Some(&AlertSeverity::Critical)
            );
        }

        #[test]
        fn severity_display() {
            assert_eq!(AlertSeverity::Low.to_string(), "low");
            assert_eq!(AlertSeverity::Critical.to_string(), "critical");
        }

        #[test]
        fn severity_serializes_lowercase() {
            let json = serde_json::to_string(&AlertSeverity::High).unwrap();
            assert_eq!(json, "\"high\"");
        }
    }

    mod metric_tests {
        use super::*;

        #[test]
        fn metrics_map_to_distinct_alert_types() {
            let metrics = [
                Metric::Temperature,
                Metric::Humidity,
                Metric::WeightChange,
                Metric::SoundLevel,
                Metric::Battery,
            ];
            let mut types: Vec<_> = metrics.iter().map(Metric::alert_type).collect();
            types.sort();
            types.dedup();
            assert_eq!(types.len(), metrics.len());
        }

        #[test]
        fn sample_value_lookup() {
            let sample = SensorSample::now()
                .with_temperature(35.0)
                .with_battery_level(80.0);
            assert_eq!(sample.value(Metric::Temperature), Some(35.0));
            assert_eq!(sample.value(Metric::Battery), Some(80.0));
            assert_eq!(sample.value(Metric::Humidity), None);
        }

        #[test]
        fn sample_deserializes_with_missing_metrics() {
            let json = r#"{"temperature": 36.5, "recorded_at": "2024-05-01T12:00:00Z"}"#;
            let sample: SensorSample = serde_json::from_str(json).unwrap();
            assert_eq!(sample.temperature, Some(36.5));
            assert!(sample.humidity.is_none());
        }
    }

    mod limits_tests {
        use super::*;

        #[test]
        fn defaults_are_valid() {
            let limits = ThresholdLimits::default();
            assert!(limits.validate().is_ok());
            assert!((limits.temperature_min - 32.0).abs() < f64::EPSILON);
            assert!((limits.temperature_max - 38.0).abs() < f64::EPSILON);
            assert_eq!(limits.inspection_reminder_days, 7);
        }

        #[test]
        fn inverted_temperature_range_fails() {
            let limits = ThresholdLimits {
                temperature_min: 40.0,
                temperature_max: 38.0,
                ..ThresholdLimits::default()
            };
            match limits.validate() {
                Err(AlertError::Configuration { reason }) => {
                    assert!(reason.contains("temperature_min"));
                }
                _ => panic!("expected Configuration error"),
            }
        }

        #[test]
        fn equal_humidity_bounds_fail() {
            let limits = ThresholdLimits {
                humidity_min: 50.0,
                humidity_max: 50.0,
                ..ThresholdLimits::default()
            };
            assert!(limits.validate().is_err());
        }

        #[test]
        fn non_finite_value_fails() {
            let limits = ThresholdLimits {
                sound_level_threshold: f64::NAN,
                ..ThresholdLimits::default()
            };
            assert!(limits.validate().is_err());
        }

        #[test]
        fn zero_inspection_days_fails() {
            let limits = ThresholdLimits {
                inspection_reminder_days: 0,
                ..ThresholdLimits::default()
            };
            assert!(limits.validate().is_err());
        }

        #[test]
        fn battery_level_out_of_range_fails() {
            let limits = ThresholdLimits {
                battery_warning_level: 120.0,
                ..ThresholdLimits::default()
            };
            assert!(limits.validate().is_err());
        }
    }

    mod profile_tests {
        use super::*;

        #[test]
        fn builtin_profile_scope() {
            let profile = ThresholdProfile::builtin();
            assert_eq!(profile.scope, ProfileScope::BuiltIn);
            assert!(!profile.is_override());
        }

        #[test]
        fn new_profile_validates() {
            let limits = ThresholdLimits {
                temperature_min: 40.0,
                temperature_max: 38.0,
                ..ThresholdLimits::default()
            };
            assert!(ThresholdProfile::new(ProfileScope::Global, limits).is_err());
        }

        #[test]
        fn scope_display() {
            let hive = HiveId::new("h1").unwrap();
            assert_eq!(ProfileScope::Global.to_string(), "global");
            assert_eq!(ProfileScope::Hive(hive).to_string(), "hive:h1");
        }

        #[test]
        fn scope_serialization_roundtrip() {
            let scope = ProfileScope::Hive(HiveId::new("h1").unwrap());
            let json = serde_json::to_string(&scope).unwrap();
            let parsed: ProfileScope = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, scope);
        }
    }

    mod alert_tests {
        use super::*;

        fn test_alert() -> Alert {
            let hive = HiveId::new("hive-1").unwrap();
            Alert::new(
                NewAlert::new(hive, AlertType::Temperature, AlertSeverity::High, "too hot")
                    .trigger("value", 45.0)
                    .trigger("metric", "temperature"),
            )
        }

        #[test]
        fn new_alert_is_active() {
            let alert = test_alert();
            assert!(alert.is_active());
            assert!(alert.resolved_at.is_none());
            assert_eq!(
                alert.trigger_values.get("value"),
                Some(&TriggerValue::Number(45.0))
            );
        }

        #[test]
        fn resolve_records_audit_fields() {
            let mut alert = test_alert();
            let at = Utc::now();
            alert
                .resolve("beekeeper-1", Some("vent opened".to_string()), at)
                .unwrap();

            assert!(alert.is_resolved);
            assert_eq!(alert.resolved_at, Some(at));
            assert_eq!(alert.resolved_by.as_deref(), Some("beekeeper-1"));
            assert_eq!(alert.resolution_notes.as_deref(), Some("vent opened"));
        }

        #[test]
        fn second_resolve_fails() {
            let mut alert = test_alert();
            alert.resolve("a", None, Utc::now()).unwrap();
            let first_resolved_at = alert.resolved_at;

            let result = alert.resolve("b", None, Utc::now());
            assert!(matches!(result, Err(AlertError::AlreadyResolved { .. })));
            assert_eq!(alert.resolved_at, first_resolved_at);
            assert_eq!(alert.resolved_by.as_deref(), Some("a"));
        }

        #[test]
        fn trigger_values_serialize_untagged() {
            let alert = test_alert();
            let json = serde_json::to_value(&alert).unwrap();
            assert_eq!(json["trigger_values"]["value"], 45.0);
            assert_eq!(json["trigger_values"]["metric"], "temperature");
        }
    }
}
