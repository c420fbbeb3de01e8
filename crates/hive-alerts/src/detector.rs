//! Anomaly detection against a threshold profile.
//!
//! The [`AnomalyDetector`] compares each metric present in a [`SensorSample`]
//! with the bounds of a [`ThresholdProfile`] and produces one [`Finding`] per
//! breached metric. How far a reading is past its bound is turned into an
//! [`AlertSeverity`] by a [`SeverityPolicy`], which is plain data so the
//! cutoffs can be tuned from configuration.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AlertError, Result};
use crate::types::{
    AlertSeverity, AlertType, HiveId, Metric, NewAlert, SensorSample, ThresholdLimits,
    ThresholdProfile, TriggerValue, TriggerValues,
};

/// A severity assigned once the relative deviation reaches `min_deviation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityBand {
    /// Lowest relative deviation covered by this band.
    pub min_deviation: f64,
    /// Severity for deviations in this band.
    pub severity: AlertSeverity,
}

impl SeverityBand {
    /// Creates a severity band.
    #[must_use]
    pub const fn new(min_deviation: f64, severity: AlertSeverity) -> Self {
        Self {
            min_deviation,
            severity,
        }
    }
}

/// Table mapping breach magnitude to severity.
///
/// The relative deviation of a breach is its distance past the bound divided
/// by the width of the range for temperature and humidity, or by the bound
/// itself (at least 1) for scalar limits and battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityPolicy {
    /// Ascending bands on the relative deviation.
    pub bands: Vec<SeverityBand>,
    /// A range breach this many range widths past the bound is critical.
    pub range_critical_widths: f64,
    /// A scalar reading at this multiple of its threshold is critical.
    pub scalar_critical_multiple: f64,
    /// A battery level at or below this fraction of the warning level is critical.
    pub battery_critical_fraction: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            bands: vec![
                SeverityBand::new(0.0, AlertSeverity::Low),
                SeverityBand::new(0.10, AlertSeverity::Medium),
                SeverityBand::new(0.25, AlertSeverity::High),
            ],
            range_critical_widths: 1.0,
            scalar_critical_multiple: 2.0,
            battery_critical_fraction: 0.5,
        }
    }
}

impl SeverityPolicy {
    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Configuration` if:
    /// - There are no bands, or the first band does not start at zero
    /// - Band deviations are not strictly ascending or not finite
    /// - Any critical multiplier is not positive
    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.bands.first() else {
            return Err(AlertError::configuration(
                "severity policy needs at least one band",
            ));
        };
        if first.min_deviation != 0.0 {
            return Err(AlertError::configuration(
                "first severity band must start at deviation 0",
            ));
        }
        if self.bands.iter().any(|b| !b.min_deviation.is_finite()) {
            return Err(AlertError::configuration(
                "severity band deviations must be finite",
            ));
        }
        if self
            .bands
            .windows(2)
            .any(|w| w[1].min_deviation <= w[0].min_deviation)
        {
            return Err(AlertError::configuration(
                "severity bands must be strictly ascending",
            ));
        }

        let multipliers = [
            ("range_critical_widths", self.range_critical_widths),
            ("scalar_critical_multiple", self.scalar_critical_multiple),
            ("battery_critical_fraction", self.battery_critical_fraction),
        ];
        for (name, value) in multipliers {
            if !value.is_finite() || value <= 0.0 {
                return Err(AlertError::configuration(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    /// Returns the band severity for a relative deviation.
    #[must_use]
    pub fn band(&self, deviation: f64) -> AlertSeverity {
        self.bands
            .iter()
            .rev()
            .find(|b| deviation >= b.min_deviation)
            .map_or(AlertSeverity::Low, |b| b.severity)
    }
}

/// Which side of a limit a reading crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    /// Below the range minimum.
    Min,
    /// Above the range maximum.
    Max,
    /// At or beyond a scalar threshold.
    Threshold,
    /// At or below the battery warning level.
    WarningLevel,
}

impl LimitKind {
    /// Returns the limit kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Threshold => "threshold",
            Self::WarningLevel => "warning_level",
        }
    }
}

/// One breached metric in a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    /// The breached metric.
    pub metric: Metric,
    /// The alert type this breach raises.
    pub alert_type: AlertType,
    /// The assigned severity.
    pub severity: AlertSeverity,
    /// The reading.
    pub value: f64,
    /// The bound that was crossed.
    pub bound: f64,
    /// Which limit was crossed.
    pub limit: LimitKind,
    /// Human-readable description.
    pub message: String,
    /// Structured payload for the alert.
    pub trigger_values: TriggerValues,
}

impl Finding {
    /// Converts the finding into an alert request for a hive.
    #[must_use]
    pub fn into_new_alert(self, hive_id: HiveId) -> NewAlert {
        NewAlert::new(hive_id, self.alert_type, self.severity, self.message)
            .trigger_values(self.trigger_values)
    }
}

/// Detects out-of-bounds metrics in sensor samples.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    policy: SeverityPolicy,
}

impl AnomalyDetector {
    /// Creates a detector with the given severity policy.
    #[must_use]
    pub const fn new(policy: SeverityPolicy) -> Self {
        Self { policy }
    }

    /// Returns the severity policy.
    #[must_use]
    pub const fn policy(&self) -> &SeverityPolicy {
        &self.policy
    }

    /// Returns one finding per metric in `sample` that breaches `profile`.
    #[must_use]
    pub fn detect(&self, sample: &SensorSample, profile: &ThresholdProfile) -> Vec<Finding> {
        let limits = &profile.limits;
        let metrics = [
            Metric::Temperature,
            Metric::Humidity,
            Metric::WeightChange,
            Metric::SoundLevel,
            Metric::Battery,
        ];

        metrics
            .into_iter()
            .filter_map(|metric| {
                let value = sample.value(metric)?;
                if !value.is_finite() {
                    debug!(metric = %metric, "ignoring non-finite reading");
                    return None;
                }
                self.check(metric, value, limits)
                    .map(|(limit, bound, severity)| {
                        build_finding(metric, value, bound, limit, severity, sample)
                    })
            })
            .collect()
    }

    /// Returns the crossed limit, its bound, and the severity if `value` breaches.
    fn check(
        &self,
        metric: Metric,
        value: f64,
        limits: &ThresholdLimits,
    ) -> Option<Breach> {
        match metric {
            Metric::Temperature => {
                self.check_range(value, limits.temperature_min, limits.temperature_max)
            }
            Metric::Humidity => self.check_range(value, limits.humidity_min, limits.humidity_max),
            // weight gains and losses both count
            Metric::WeightChange => self.check_scalar(value.abs(), limits.weight_change_threshold),
            Metric::SoundLevel => self.check_scalar(value, limits.sound_level_threshold),
            Metric::Battery => self.check_battery(value, limits.battery_warning_level),
        }
    }

    fn check_range(&self, value: f64, min: f64, max: f64) -> Option<Breach> {
        let (limit, bound) = if value < min {
            (LimitKind::Min, min)
        } else if value > max {
            (LimitKind::Max, max)
        } else {
            return None;
        };

        let width = max - min;
        let distance = (value - bound).abs();
        let severity = if distance >= self.policy.range_critical_widths * width {
            AlertSeverity::Critical
        } else {
            self.policy.band(distance / width)
        };
        Some((limit, bound, severity))
    }

    fn check_scalar(&self, value: f64, threshold: f64) -> Option<Breach> {
        if value < threshold {
            return None;
        }
        let severity = if value >= self.policy.scalar_critical_multiple * threshold {
            AlertSeverity::Critical
        } else {
            self.policy.band(relative(value - threshold, threshold))
        };
        Some((LimitKind::Threshold, threshold, severity))
    }

    fn check_battery(&self, value: f64, warning: f64) -> Option<Breach> {
        if value > warning {
            return None;
        }
        let severity = if value <= self.policy.battery_critical_fraction * warning {
            AlertSeverity::Critical
        } else {
            self.policy.band(relative(warning - value, warning))
        };
        Some((LimitKind::WarningLevel, warning, severity))
    }
}

/// Which limit was crossed, its value, and the resulting severity.
type Breach = (LimitKind, f64, AlertSeverity);

fn relative(distance: f64, bound: f64) -> f64 {
    distance / bound.abs().max(1.0)
}

fn build_finding(
    metric: Metric,
    value: f64,
    bound: f64,
    limit: LimitKind,
    severity: AlertSeverity,
    sample: &SensorSample,
) -> Finding {
    let unit = metric.unit();
    let message = match (metric, limit) {
        (Metric::Temperature, LimitKind::Min) => {
            format!("Temperature {value:.1}{unit} is below the minimum of {bound:.1}{unit}")
        }
        (Metric::Temperature, _) => {
            format!("Temperature {value:.1}{unit} is above the maximum of {bound:.1}{unit}")
        }
        (Metric::Humidity, LimitKind::Min) => {
            format!("Humidity {value:.1}{unit} is below the minimum of {bound:.1}{unit}")
        }
        (Metric::Humidity, _) => {
            format!("Humidity {value:.1}{unit} is above the maximum of {bound:.1}{unit}")
        }
        (Metric::WeightChange, _) => {
            format!("Weight changed by {value:+.2}{unit}, threshold is {bound:.2}{unit}")
        }
        (Metric::SoundLevel, _) => {
            format!("Sound level {value:.1}{unit} reached the threshold of {bound:.1}{unit}")
        }
        (Metric::Battery, _) => {
            format!("Battery level {value:.0}{unit} is at or below the warning level of {bound:.0}{unit}")
        }
    };

    let mut trigger_values = TriggerValues::new();
    trigger_values.insert("metric".to_string(), TriggerValue::from(metric.as_str()));
    trigger_values.insert("value".to_string(), TriggerValue::Number(value));
    trigger_values.insert("bound".to_string(), TriggerValue::Number(bound));
    trigger_values.insert("limit".to_string(), TriggerValue::from(limit.as_str()));
    trigger_values.insert(
        "recorded_at".to_string(),
        TriggerValue::Text(sample.recorded_at.to_rfc3339()),
    );

    Finding {
        metric,
        alert_type: metric.alert_type(),
        severity,
        value,
        bound,
        limit,
        message,
        trigger_values,
    }
}
