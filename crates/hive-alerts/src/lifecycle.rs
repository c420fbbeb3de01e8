//! The alert lifecycle manager.
//!
//! [`AlertLifecycleManager`] is the only writer into the [`AlertLedger`]. For
//! each hive it resolves the effective thresholds, runs the detector over the
//! hive's samples, and turns every finding into either a new alert or a
//! suppressed duplicate of the alert that is already active. It also owns the
//! resolve operations so that every state change is reported to the
//! registered notifiers.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LifecycleConfig;
use crate::detector::AnomalyDetector;
use crate::error::{AlertError, Result};
use crate::ledger::AlertLedger;
use crate::notify::{AlertEvent, AlertNotifier};
use crate::resolver::ThresholdResolver;
use crate::store::{ThresholdSource, ThresholdStore};
use crate::types::{
    Alert, AlertId, AlertSeverity, AlertType, HiveId, NewAlert, SensorSample, ThresholdProfile,
    TriggerValue,
};

/// A hive whose evaluation failed during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiveFailure {
    /// The hive that failed.
    pub hive_id: HiveId,
    /// What went wrong.
    pub reason: String,
}

/// Overall outcome of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepStatus {
    /// At least one hive was evaluated, or there was nothing to evaluate.
    Completed,
    /// Every examined hive failed.
    Failed,
}

impl fmt::Display for SweepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Summary of a sweep over one or more hives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Number of hives the sweep looked at.
    pub hives_examined: usize,
    /// Alerts opened by this sweep.
    pub alerts_created: Vec<Alert>,
    /// Findings dropped because an alert for the same condition was already active.
    pub suppressed: usize,
    /// Hives that could not be evaluated.
    pub failures: Vec<HiveFailure>,
    /// When the sweep started.
    pub started_at: DateTime<Utc>,
    /// When the sweep finished.
    pub completed_at: DateTime<Utc>,
}

impl EvaluationResult {
    fn started() -> Self {
        let now = Utc::now();
        Self {
            hives_examined: 0,
            alerts_created: Vec::new(),
            suppressed: 0,
            failures: Vec::new(),
            started_at: now,
            completed_at: now,
        }
    }

    /// Returns the sweep status.
    #[must_use]
    pub fn status(&self) -> SweepStatus {
        if self.hives_examined > 0 && self.failures.len() == self.hives_examined {
            SweepStatus::Failed
        } else {
            SweepStatus::Completed
        }
    }

    /// Returns the number of hives evaluated without error.
    #[must_use]
    pub fn hives_succeeded(&self) -> usize {
        self.hives_examined - self.failures.len()
    }
}

/// Everything a sweep knows about one hive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HiveReadings {
    /// Recent samples, oldest first.
    pub samples: Vec<SensorSample>,
    /// When the hive was last inspected, if known.
    pub last_inspection: Option<DateTime<Utc>>,
}

impl From<Vec<SensorSample>> for HiveReadings {
    fn from(samples: Vec<SensorSample>) -> Self {
        Self {
            samples,
            last_inspection: None,
        }
    }
}

#[derive(Debug, Default)]
struct Outcome {
    created: Vec<Alert>,
    suppressed: usize,
}

/// Turns detector findings into deduplicated alerts.
pub struct AlertLifecycleManager<S = ThresholdStore> {
    resolver: ThresholdResolver<S>,
    detector: AnomalyDetector,
    ledger: AlertLedger,
    config: LifecycleConfig,
    notifiers: Arc<RwLock<Vec<Box<dyn AlertNotifier>>>>,
}

impl<S: ThresholdSource> AlertLifecycleManager<S> {
    /// Creates a manager with the default configuration.
    #[must_use]
    pub fn new(thresholds: Arc<S>, ledger: AlertLedger) -> Self {
        Self::with_config(thresholds, ledger, LifecycleConfig::default())
    }

    /// Creates a manager with a custom configuration.
    #[must_use]
    pub fn with_config(thresholds: Arc<S>, ledger: AlertLedger, config: LifecycleConfig) -> Self {
        Self {
            resolver: ThresholdResolver::new(thresholds),
            detector: AnomalyDetector::new(config.severity.clone()),
            ledger,
            config,
            notifiers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Returns the alert ledger.
    #[must_use]
    pub const fn ledger(&self) -> &AlertLedger {
        &self.ledger
    }

    /// Returns the threshold resolver.
    #[must_use]
    pub const fn resolver(&self) -> &ThresholdResolver<S> {
        &self.resolver
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Registers a notifier for alert events.
    pub fn add_notifier(&self, notifier: Box<dyn AlertNotifier>) {
        info!(notifier = %notifier.name(), "added alert notifier");
        self.notifiers.write().push(notifier);
    }

    /// Returns the number of registered notifiers.
    #[must_use]
    pub fn notifier_count(&self) -> usize {
        self.notifiers.read().len()
    }

    // ============ Evaluation ============

    /// Evaluates one sample for a hive and returns the alerts it opened.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::ThresholdLookup` if the hive's thresholds cannot
    /// be resolved.
    pub fn evaluate(&self, hive_id: &HiveId, sample: &SensorSample) -> Result<Vec<Alert>> {
        self.evaluate_samples(hive_id, std::slice::from_ref(sample))
    }

    /// Evaluates samples for a hive in the order given.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::ThresholdLookup` if the hive's thresholds cannot
    /// be resolved.
    pub fn evaluate_samples(
        &self,
        hive_id: &HiveId,
        samples: &[SensorSample],
    ) -> Result<Vec<Alert>> {
        let profile = self.resolver.resolve(hive_id)?;
        Ok(self.apply(hive_id, samples, &profile).created)
    }

    /// Evaluates many hives, isolating failures per hive.
    ///
    /// Entries for the same hive are merged into one, keeping the samples in
    /// input order, so each hive is examined once.
    pub fn evaluate_all<I>(&self, hive_samples: I) -> EvaluationResult
    where
        I: IntoIterator<Item = (HiveId, Vec<SensorSample>)>,
    {
        let mut order = Vec::new();
        let mut merged: HashMap<HiveId, Vec<SensorSample>> = HashMap::new();
        for (hive_id, samples) in hive_samples {
            match merged.entry(hive_id) {
                Entry::Occupied(mut entry) => entry.get_mut().extend(samples),
                Entry::Vacant(entry) => {
                    order.push(entry.key().clone());
                    entry.insert(samples);
                }
            }
        }

        self.sweep(order.into_iter().map(|hive_id| {
            let samples = merged.remove(&hive_id).unwrap_or_default();
            (hive_id, Ok(HiveReadings::from(samples)))
        }))
    }

    /// Sweeps the given hives, fetching each hive's readings with `fetch`.
    ///
    /// Threshold lookup and fetch errors are recorded in the result's
    /// failures and the sweep moves on to the next hive. Repeated IDs are
    /// swept once.
    pub fn sweep_with<F>(&self, hive_ids: &[HiveId], mut fetch: F) -> EvaluationResult
    where
        F: FnMut(&HiveId) -> Result<HiveReadings>,
    {
        let mut seen = HashSet::new();
        self.sweep(
            hive_ids
                .iter()
                .filter(|id| seen.insert(*id))
                .map(|id| (id.clone(), fetch(id))),
        )
    }

    fn sweep<I>(&self, hives: I) -> EvaluationResult
    where
        I: Iterator<Item = (HiveId, Result<HiveReadings>)>,
    {
        let mut result = EvaluationResult::started();

        for (hive_id, readings) in hives {
            result.hives_examined += 1;

            match self.sweep_hive(&hive_id, readings) {
                Ok(outcome) => {
                    result.suppressed += outcome.suppressed;
                    result.alerts_created.extend(outcome.created);
                }
                Err(e) => {
                    warn!(hive_id = %hive_id, error = %e, "failed to evaluate hive");
                    result.failures.push(HiveFailure {
                        hive_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        result.completed_at = Utc::now();
        info!(
            hives_examined = result.hives_examined,
            alerts_created = result.alerts_created.len(),
            suppressed = result.suppressed,
            failures = result.failures.len(),
            status = %result.status(),
            "sweep complete"
        );
        result
    }

    fn sweep_hive(&self, hive_id: &HiveId, readings: Result<HiveReadings>) -> Result<Outcome> {
        let readings = readings?;
        let profile = self.resolver.resolve(hive_id)?;

        let mut outcome = self.apply(hive_id, &readings.samples, &profile);
        if let Some(last) = readings.last_inspection {
            let now = Utc::now();
            match self.inspection_alert(hive_id, last, now, &profile) {
                Some(alert) => outcome.created.push(alert),
                None if is_overdue(last, now, &profile) => outcome.suppressed += 1,
                None => {}
            }
        }
        Ok(outcome)
    }

    fn apply(
        &self,
        hive_id: &HiveId,
        samples: &[SensorSample],
        profile: &ThresholdProfile,
    ) -> Outcome {
        let mut outcome = Outcome::default();
        for sample in samples {
            for finding in self.detector.detect(sample, profile) {
                debug!(
                    hive_id = %hive_id,
                    metric = %finding.metric,
                    value = finding.value,
                    severity = %finding.severity,
                    "threshold breached"
                );
                match self.record(finding.into_new_alert(hive_id.clone())) {
                    Some(alert) => outcome.created.push(alert),
                    None => outcome.suppressed += 1,
                }
            }
        }
        outcome
    }

    /// Opens an alert unless one is already active for the same condition.
    fn record(&self, new: NewAlert) -> Option<Alert> {
        if let Some(active) = self.ledger.find_active(&new.hive_id, new.alert_type) {
            debug!(
                hive_id = %new.hive_id,
                alert_type = %new.alert_type,
                active_alert = %active.id,
                "suppressed duplicate alert"
            );
            return None;
        }

        match self.ledger.create(new) {
            Ok(alert) => {
                self.emit(&AlertEvent::Created(alert.clone()));
                Some(alert)
            }
            // another evaluation won the race; its alert covers this finding
            Err(AlertError::Conflict {
                hive_id,
                alert_type,
                existing,
            }) => {
                debug!(
                    hive_id = %hive_id,
                    alert_type = %alert_type,
                    active_alert = %existing,
                    "suppressed duplicate alert"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to record alert");
                None
            }
        }
    }

    // ============ Inspections ============

    /// Raises a maintenance reminder when a hive is overdue for inspection.
    ///
    /// The reminder is `Low` once `inspection_reminder_days` have passed and
    /// `Medium` at twice that interval. Returns `None` if the hive is not
    /// overdue or a reminder is already active.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::ThresholdLookup` if the hive's thresholds cannot
    /// be resolved.
    pub fn check_inspection(
        &self,
        hive_id: &HiveId,
        last_inspection: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Alert>> {
        let profile = self.resolver.resolve(hive_id)?;
        Ok(self.inspection_alert(hive_id, last_inspection, now, &profile))
    }

    fn inspection_alert(
        &self,
        hive_id: &HiveId,
        last: DateTime<Utc>,
        now: DateTime<Utc>,
        profile: &ThresholdProfile,
    ) -> Option<Alert> {
        if !is_overdue(last, now, profile) {
            return None;
        }

        let reminder_days = profile.limits.inspection_reminder_days;
        let days_since = (now - last).num_days();
        let severity = if days_since >= 2 * i64::from(reminder_days) {
            AlertSeverity::Medium
        } else {
            AlertSeverity::Low
        };

        let new = NewAlert::new(
            hive_id.clone(),
            AlertType::Maintenance,
            severity,
            format!(
                "Hive {hive_id} was last inspected {days_since} days ago, reminder interval is {reminder_days} days"
            ),
        )
        .trigger("days_since_inspection", days_since as f64)
        .trigger("inspection_reminder_days", f64::from(reminder_days))
        .trigger("last_inspection", TriggerValue::Text(last.to_rfc3339()));

        self.record(new)
    }

    // ============ Resolution ============

    /// Resolves an alert.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotFound` for an unknown ID and
    /// `AlertError::AlreadyResolved` if the alert was resolved before.
    pub fn resolve(
        &self,
        id: &AlertId,
        resolved_by: &str,
        notes: Option<String>,
    ) -> Result<Alert> {
        let alert = self.ledger.resolve(id, resolved_by, notes)?;
        if self.config.notify_on_resolve {
            self.emit(&AlertEvent::Resolved(alert.clone()));
        }
        Ok(alert)
    }

    /// Resolves every active alert, optionally only for one hive.
    ///
    /// Returns the number of alerts resolved.
    pub fn resolve_all(
        &self,
        hive_id: Option<&HiveId>,
        resolved_by: &str,
        notes: Option<String>,
    ) -> usize {
        let resolved = self.ledger.resolve_where(hive_id, resolved_by, notes);
        if self.config.notify_on_resolve {
            for alert in &resolved {
                self.emit(&AlertEvent::Resolved(alert.clone()));
            }
        }
        resolved.len()
    }

    fn emit(&self, event: &AlertEvent) {
        let notifiers = self.notifiers.read();
        for notifier in notifiers.iter() {
            if let Err(e) = notifier.notify(event) {
                warn!(
                    notifier = %notifier.name(),
                    alert_id = %event.alert().id,
                    error = %e,
                    "failed to deliver alert event"
                );
            }
        }
    }
}

fn is_overdue(last: DateTime<Utc>, now: DateTime<Utc>, profile: &ThresholdProfile) -> bool {
    now - last >= Duration::days(i64::from(profile.limits.inspection_reminder_days))
}

impl<S> Clone for AlertLifecycleManager<S> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            detector: self.detector.clone(),
            ledger: self.ledger.clone(),
            config: self.config.clone(),
            notifiers: Arc::clone(&self.notifiers),
        }
    }
}

impl<S> fmt::Debug for AlertLifecycleManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertLifecycleManager")
            .field("ledger", &self.ledger)
            .field("config", &self.config)
            .field("notifiers", &self.notifiers.read().len())
            .finish_non_exhaustive()
    }
}
