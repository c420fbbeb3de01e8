//! The alert ledger.
//!
//! [`AlertLedger`] stores every alert ever raised and enforces the one rule
//! the rest of the engine depends on: at most one unresolved alert per
//! `(hive, alert type)` pair. The check and the insert share one write
//! section over both the alert map and the active index, so concurrent
//! creators for the same pair cannot both succeed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AlertError, Result};
use crate::types::{Alert, AlertId, AlertSeverity, AlertType, HiveId, NewAlert};

/// Criteria for listing alerts. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertFilter {
    /// Only alerts for this hive.
    pub hive_id: Option<HiveId>,
    /// Only alerts of this type.
    pub alert_type: Option<AlertType>,
    /// Only alerts with exactly this severity.
    pub severity: Option<AlertSeverity>,
    /// Only alerts at or above this severity.
    pub min_severity: Option<AlertSeverity>,
    /// Only resolved (`true`) or unresolved (`false`) alerts.
    pub resolved: Option<bool>,
    /// Number of matching alerts to skip.
    pub offset: usize,
    /// Maximum number of alerts to return.
    pub limit: Option<usize>,
}

impl AlertFilter {
    /// Creates a filter matching every alert.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter matching unresolved alerts.
    #[must_use]
    pub fn active() -> Self {
        Self::new().resolved(false)
    }

    /// Restricts the filter to one hive.
    #[must_use]
    pub fn hive(mut self, hive_id: HiveId) -> Self {
        self.hive_id = Some(hive_id);
        self
    }

    /// Restricts the filter to one alert type.
    #[must_use]
    pub const fn alert_type(mut self, alert_type: AlertType) -> Self {
        self.alert_type = Some(alert_type);
        self
    }

    /// Restricts the filter to one severity.
    #[must_use]
    pub const fn severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Restricts the filter to alerts at or above a severity.
    #[must_use]
    pub const fn min_severity(mut self, severity: AlertSeverity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    /// Restricts the filter by resolution state.
    #[must_use]
    pub const fn resolved(mut self, resolved: bool) -> Self {
        self.resolved = Some(resolved);
        self
    }

    /// Sets the page window.
    #[must_use]
    pub const fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Returns true if the alert matches every set criterion.
    #[must_use]
    pub fn matches(&self, alert: &Alert) -> bool {
        self.hive_id.as_ref().is_none_or(|h| *h == alert.hive_id)
            && self.alert_type.is_none_or(|t| t == alert.alert_type)
            && self.severity.is_none_or(|s| s == alert.severity)
            && self.min_severity.is_none_or(|s| alert.severity >= s)
            && self.resolved.is_none_or(|r| r == alert.is_resolved)
    }
}

/// Active alert counts for a hive or the whole apiary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    /// Number of unresolved alerts.
    pub active: usize,
    /// Number of resolved alerts.
    pub resolved: usize,
    /// Unresolved alerts per severity.
    pub by_severity: BTreeMap<AlertSeverity, usize>,
    /// Unresolved alerts per type.
    pub by_type: BTreeMap<AlertType, usize>,
}

impl AlertSummary {
    /// Returns the most urgent severity among unresolved alerts.
    #[must_use]
    pub fn highest_severity(&self) -> Option<AlertSeverity> {
        self.by_severity.keys().next_back().copied()
    }
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    alert: Alert,
}

#[derive(Debug, Default)]
struct LedgerState {
    alerts: HashMap<AlertId, Entry>,
    active: HashMap<(HiveId, AlertType), AlertId>,
    next_seq: u64,
}

impl LedgerState {
    fn resolve_entry(
        &mut self,
        id: &AlertId,
        resolved_by: &str,
        notes: Option<String>,
    ) -> Result<Alert> {
        let entry = self
            .alerts
            .get_mut(id)
            .ok_or_else(|| AlertError::NotFound { id: id.to_string() })?;
        entry.alert.resolve(resolved_by, notes, Utc::now())?;

        let key = (entry.alert.hive_id.clone(), entry.alert.alert_type);
        if self.active.get(&key) == Some(id) {
            self.active.remove(&key);
        }
        Ok(entry.alert.clone())
    }
}

/// In-memory store of alerts with an active-alert uniqueness index.
///
/// Cloning the ledger yields another handle to the same alerts.
#[derive(Debug, Clone, Default)]
pub struct AlertLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl AlertLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the unresolved alert for a hive and alert type, if any.
    #[must_use]
    pub fn find_active(&self, hive_id: &HiveId, alert_type: AlertType) -> Option<Alert> {
        let state = self.state.read();
        let id = state.active.get(&(hive_id.clone(), alert_type))?;
        state.alerts.get(id).map(|e| e.alert.clone())
    }

    /// Records a new unresolved alert.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Conflict` if an unresolved alert already exists
    /// for the same hive and alert type.
    pub fn create(&self, new: NewAlert) -> Result<Alert> {
        let mut state = self.state.write();

        let key = (new.hive_id.clone(), new.alert_type);
        if let Some(existing) = state.active.get(&key) {
            return Err(AlertError::Conflict {
                hive_id: new.hive_id,
                alert_type: new.alert_type,
                existing: existing.clone(),
            });
        }

        let alert = Alert::new(new);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.active.insert(key, alert.id.clone());
        state.alerts.insert(
            alert.id.clone(),
            Entry {
                seq,
                alert: alert.clone(),
            },
        );

        info!(
            alert_id = %alert.id,
            hive_id = %alert.hive_id,
            alert_type = %alert.alert_type,
            severity = %alert.severity,
            "alert created"
        );
        Ok(alert)
    }

    /// Marks an alert resolved.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotFound` if no alert has the ID, or
    /// `AlertError::AlreadyResolved` if it was resolved before.
    pub fn resolve(
        &self,
        id: &AlertId,
        resolved_by: &str,
        notes: Option<String>,
    ) -> Result<Alert> {
        let alert = self.state.write().resolve_entry(id, resolved_by, notes)?;
        info!(
            alert_id = %alert.id,
            hive_id = %alert.hive_id,
            resolved_by = %resolved_by,
            "alert resolved"
        );
        Ok(alert)
    }

    /// Resolves every unresolved alert, optionally only for one hive.
    ///
    /// Returns the number of alerts resolved.
    pub fn resolve_all(
        &self,
        hive_id: Option<&HiveId>,
        resolved_by: &str,
        notes: Option<String>,
    ) -> usize {
        self.resolve_where(hive_id, resolved_by, notes).len()
    }

    /// Resolves every unresolved alert matching `hive_id` and returns them.
    pub(crate) fn resolve_where(
        &self,
        hive_id: Option<&HiveId>,
        resolved_by: &str,
        notes: Option<String>,
    ) -> Vec<Alert> {
        let mut state = self.state.write();
        let ids: Vec<AlertId> = state
            .active
            .iter()
            .filter(|((hive, _), _)| hive_id.is_none_or(|h| h == hive))
            .map(|(_, id)| id.clone())
            .collect();

        let resolved: Vec<Alert> = ids
            .iter()
            .filter_map(|id| state.resolve_entry(id, resolved_by, notes.clone()).ok())
            .collect();
        drop(state);

        if !resolved.is_empty() {
            info!(
                hive_id = ?hive_id.map(HiveId::as_str),
                resolved_by = %resolved_by,
                count = resolved.len(),
                "bulk resolved alerts"
            );
        }
        resolved
    }

    /// Returns an alert by ID.
    #[must_use]
    pub fn get(&self, id: &AlertId) -> Option<Alert> {
        self.state.read().alerts.get(id).map(|e| e.alert.clone())
    }

    /// Returns matching alerts, newest first.
    ///
    /// Alerts created within the same instant keep a stable order, the most
    /// recently inserted first.
    #[must_use]
    pub fn list(&self, filter: &AlertFilter) -> Vec<Alert> {
        let state = self.state.read();
        let mut entries: Vec<&Entry> = state
            .alerts
            .values()
            .filter(|e| filter.matches(&e.alert))
            .collect();
        entries.sort_by(|a, b| {
            b.alert
                .created_at
                .cmp(&a.alert.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        entries
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .map(|e| e.alert.clone())
            .collect()
    }

    /// Returns the number of matching alerts, ignoring paging.
    #[must_use]
    pub fn count(&self, filter: &AlertFilter) -> usize {
        self.state
            .read()
            .alerts
            .values()
            .filter(|e| filter.matches(&e.alert))
            .count()
    }

    /// Summarizes alerts for one hive or for every hive.
    #[must_use]
    pub fn summary(&self, hive_id: Option<&HiveId>) -> AlertSummary {
        let state = self.state.read();
        let mut summary = AlertSummary::default();

        for alert in state
            .alerts
            .values()
            .map(|e| &e.alert)
            .filter(|a| hive_id.is_none_or(|h| *h == a.hive_id))
        {
            if alert.is_resolved {
                summary.resolved += 1;
                continue;
            }
            summary.active += 1;
            *summary.by_severity.entry(alert.severity).or_default() += 1;
            *summary.by_type.entry(alert.alert_type).or_default() += 1;
        }
        summary
    }

    /// Returns the number of unresolved alerts.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.state.read().active.len()
    }

    /// Returns the total number of alerts, resolved or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().alerts.len()
    }

    /// Returns true if no alert was ever recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().alerts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hive(id: &str) -> HiveId {
        HiveId::new(id).unwrap()
    }

    fn new_alert(hive_id: &str, alert_type: AlertType, severity: AlertSeverity) -> NewAlert {
        NewAlert::new(hive(hive_id), alert_type, severity, "test alert")
    }

    mod create_tests {
        use super::*;

        #[test]
        fn create_alert() {
            let ledger = AlertLedger::new();
            let alert = ledger
                .create(new_alert("h1", AlertType::Temperature, AlertSeverity::High))
                .unwrap();

            assert!(alert.is_active());
            assert_eq!(ledger.len(), 1);
            assert_eq!(ledger.active_count(), 1);
            assert_eq!(
                ledger.find_active(&hive("h1"), AlertType::Temperature),
                Some(alert)
            );
        }

        #[test]
        fn duplicate_active_conflicts() {
            let ledger = AlertLedger::new();
            let first = ledger
                .create(new_alert("h1", AlertType::Temperature, AlertSeverity::High))
                .unwrap();

            let result = ledger.create(new_alert("h1", AlertType::Temperature, AlertSeverity::Low));
            match result {
                Err(AlertError::Conflict { existing, .. }) => assert_eq!(existing, first.id),
                other => panic!("expected Conflict, got {other:?}"),
            }
            assert_eq!(ledger.len(), 1);
        }

        #[test]
        fn pairs_are_independent() {
            let ledger = AlertLedger::new();
            ledger
                .create(new_alert("h1", AlertType::Temperature, AlertSeverity::High))
                .unwrap();
            ledger
                .create(new_alert("h1", AlertType::Humidity, AlertSeverity::High))
                .unwrap();
            ledger
                .create(new_alert("h2", AlertType::Temperature, AlertSeverity::High))
                .unwrap();
            assert_eq!(ledger.active_count(), 3);
        }

        #[test]
        fn create_after_resolve_opens_new_alert() {
            let ledger = AlertLedger::new();
            let first = ledger
                .create(new_alert("h1", AlertType::Battery, AlertSeverity::Low))
                .unwrap();
            ledger.resolve(&first.id, "keeper", None).unwrap();

            let second = ledger
                .create(new_alert("h1", AlertType::Battery, AlertSeverity::Low))
                .unwrap();
            assert_ne!(first.id, second.id);
            assert_eq!(ledger.len(), 2);
            assert_eq!(ledger.active_count(), 1);
        }

        #[test]
        fn concurrent_creates_yield_one_alert() {
            let ledger = AlertLedger::new();
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let ledger = ledger.clone();
                    std::thread::spawn(move || {
                        ledger
                            .create(new_alert("h1", AlertType::Security, AlertSeverity::High))
                            .is_ok()
                    })
                })
                .collect();

            let created = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count();
            assert_eq!(created, 1);
            assert_eq!(ledger.len(), 1);
        }
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn resolve_alert() {
            let ledger = AlertLedger::new();
            let alert = ledger
                .create(new_alert("h1", AlertType::Temperature, AlertSeverity::High))
                .unwrap();

            let resolved = ledger
                .resolve(&alert.id, "keeper", Some("shaded the hive".to_string()))
                .unwrap();
            assert!(resolved.is_resolved);
            assert_eq!(resolved.resolved_by.as_deref(), Some("keeper"));
            assert!(ledger.find_active(&hive("h1"), AlertType::Temperature).is_none());
            assert_eq!(ledger.get(&alert.id), Some(resolved));
        }

        #[test]
        fn resolve_unknown_is_not_found() {
            let ledger = AlertLedger::new();
            let result = ledger.resolve(&AlertId::new(), "keeper", None);
            assert!(matches!(result, Err(AlertError::NotFound { .. })));
        }

        #[test]
        fn resolve_twice_fails() {
            let ledger = AlertLedger::new();
            let alert = ledger
                .create(new_alert("h1", AlertType::Temperature, AlertSeverity::High))
                .unwrap();
            let first = ledger.resolve(&alert.id, "a", None).unwrap();

            let result = ledger.resolve(&alert.id, "b", None);
            assert!(matches!(result, Err(AlertError::AlreadyResolved { .. })));
            assert_eq!(ledger.get(&alert.id), Some(first));
        }

        #[test]
        fn resolving_old_alert_keeps_new_one_active() {
            let ledger = AlertLedger::new();
            let old = ledger
                .create(new_alert("h1", AlertType::Humidity, AlertSeverity::Low))
                .unwrap();
            ledger.resolve(&old.id, "a", None).unwrap();
            let new = ledger
                .create(new_alert("h1", AlertType::Humidity, AlertSeverity::Low))
                .unwrap();

            assert!(ledger.resolve(&old.id, "a", None).is_err());
            assert_eq!(
                ledger.find_active(&hive("h1"), AlertType::Humidity).map(|a| a.id),
                Some(new.id)
            );
        }

        #[test]
        fn resolve_all_for_hive() {
            let ledger = AlertLedger::new();
            ledger
                .create(new_alert("h1", AlertType::Temperature, AlertSeverity::High))
                .unwrap();
            ledger
                .create(new_alert("h1", AlertType::Battery, AlertSeverity::Low))
                .unwrap();
            ledger
                .create(new_alert("h2", AlertType::Battery, AlertSeverity::Low))
                .unwrap();

            assert_eq!(ledger.resolve_all(Some(&hive("h1")), "keeper", None), 2);
            assert_eq!(ledger.active_count(), 1);
            assert!(ledger.find_active(&hive("h2"), AlertType::Battery).is_some());
        }

        #[test]
        fn resolve_all_everywhere() {
            let ledger = AlertLedger::new();
            ledger
                .create(new_alert("h1", AlertType::Temperature, AlertSeverity::High))
                .unwrap();
            ledger
                .create(new_alert("h2", AlertType::Battery, AlertSeverity::Low))
                .unwrap();

            assert_eq!(ledger.resolve_all(None, "keeper", Some("season end".into())), 2);
            assert_eq!(ledger.active_count(), 0);
            assert_eq!(ledger.resolve_all(None, "keeper", None), 0);
        }
    }

    mod list_tests {
        use super::*;

        fn populated() -> AlertLedger {
            let ledger = AlertLedger::new();
            ledger
                .create(new_alert("h1", AlertType::Temperature, AlertSeverity::Critical))
                .unwrap();
            ledger
                .create(new_alert("h1", AlertType::Humidity, AlertSeverity::Low))
                .unwrap();
            ledger
                .create(new_alert("h2", AlertType::Temperature, AlertSeverity::Medium))
                .unwrap();
            let battery = ledger
                .create(new_alert("h2", AlertType::Battery, AlertSeverity::High))
                .unwrap();
            ledger.resolve(&battery.id, "keeper", None).unwrap();
            ledger
        }

        #[test]
        fn list_newest_first() {
            let ledger = populated();
            let alerts = ledger.list(&AlertFilter::new());
            assert_eq!(alerts.len(), 4);
            assert_eq!(alerts[0].alert_type, AlertType::Battery);
            assert_eq!(alerts[3].alert_type, AlertType::Temperature);
            assert_eq!(alerts[3].hive_id, hive("h1"));
        }

        #[test]
        fn filter_by_hive_and_state() {
            let ledger = populated();
            assert_eq!(ledger.list(&AlertFilter::new().hive(hive("h1"))).len(), 2);
            assert_eq!(ledger.list(&AlertFilter::active()).len(), 3);
            assert_eq!(ledger.list(&AlertFilter::new().resolved(true)).len(), 1);
        }

        #[test]
        fn filter_by_type_and_severity() {
            let ledger = populated();
            assert_eq!(
                ledger
                    .list(&AlertFilter::new().alert_type(AlertType::Temperature))
                    .len(),
                2
            );
            assert_eq!(
                ledger
                    .list(&AlertFilter::new().severity(AlertSeverity::Low))
                    .len(),
                1
            );
            assert_eq!(
                ledger
                    .list(&AlertFilter::active().min_severity(AlertSeverity::Medium))
                    .len(),
                2
            );
        }

        #[test]
        fn paging() {
            let ledger = populated();
            let all = ledger.list(&AlertFilter::new());
            let page = ledger.list(&AlertFilter::new().page(1, 2));
            assert_eq!(page.len(), 2);
            assert_eq!(page[0].id, all[1].id);
            assert_eq!(page[1].id, all[2].id);

            assert!(ledger.list(&AlertFilter::new().page(10, 2)).is_empty());
            assert_eq!(ledger.count(&AlertFilter::new().page(1, 2)), 4);
        }

        #[test]
        fn summary_counts() {
            let ledger = populated();
            let summary = ledger.summary(None);
            assert_eq!(summary.active, 3);
            assert_eq!(summary.resolved, 1);
            assert_eq!(summary.by_type.get(&AlertType::Temperature), Some(&2));
            assert_eq!(summary.highest_severity(), Some(AlertSeverity::Critical));

            let h2 = ledger.summary(Some(&hive("h2")));
            assert_eq!(h2.active, 1);
            assert_eq!(h2.highest_severity(), Some(AlertSeverity::Medium));
        }

        #[test]
        fn empty_ledger() {
            let ledger = AlertLedger::new();
            assert!(ledger.is_empty());
            assert!(ledger.list(&AlertFilter::new()).is_empty());
            assert_eq!(ledger.summary(None), AlertSummary::default());
            assert_eq!(AlertSummary::default().highest_severity(), None);
        }
    }
}
