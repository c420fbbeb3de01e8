//! Where sweeps get their input.
//!
//! A sweep needs two things the engine does not own: the list of hives to
//! check ([`HiveDirectory`]) and the recent readings of each hive
//! ([`SampleSource`]). Both are traits so deployments can back them with a
//! database or a device gateway; the in-memory versions here serve tests and
//! the command line.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::Result;
use crate::types::{HiveId, SensorSample};

/// Supplies recent sensor samples per hive.
pub trait SampleSource: Send + Sync {
    /// Returns the samples to evaluate for a hive, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::SourceUnavailable` if the source cannot be reached.
    fn samples(&self, hive_id: &HiveId) -> Result<Vec<SensorSample>>;
}

/// Lists the hives a full sweep covers.
pub trait HiveDirectory: Send + Sync {
    /// Returns every hive to check.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::SourceUnavailable` if the directory cannot be reached.
    fn hive_ids(&self) -> Result<Vec<HiveId>>;

    /// Returns when the hive was last inspected, if known.
    fn last_inspection(&self, _hive_id: &HiveId) -> Option<DateTime<Utc>> {
        None
    }
}

/// Sample source backed by a map, for tests and one-shot checks.
#[derive(Debug, Default)]
pub struct InMemorySampleSource {
    samples: RwLock<HashMap<HiveId, Vec<SensorSample>>>,
}

impl InMemorySampleSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source holding the given samples.
    #[must_use]
    pub fn from_map(samples: HashMap<HiveId, Vec<SensorSample>>) -> Self {
        Self {
            samples: RwLock::new(samples),
        }
    }

    /// Appends a sample for a hive.
    pub fn push(&self, hive_id: &HiveId, sample: SensorSample) {
        self.samples
            .write()
            .entry(hive_id.clone())
            .or_default()
            .push(sample);
    }

    /// Replaces the samples for a hive.
    pub fn set_samples(&self, hive_id: &HiveId, samples: Vec<SensorSample>) {
        self.samples.write().insert(hive_id.clone(), samples);
    }

    /// Removes and returns the samples for a hive.
    pub fn clear(&self, hive_id: &HiveId) -> Vec<SensorSample> {
        self.samples.write().remove(hive_id).unwrap_or_default()
    }

    /// Returns the hives that have samples, sorted.
    #[must_use]
    pub fn hive_ids(&self) -> Vec<HiveId> {
        let mut ids: Vec<_> = self.samples.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl SampleSource for InMemorySampleSource {
    fn samples(&self, hive_id: &HiveId) -> Result<Vec<SensorSample>> {
        Ok(self
            .samples
            .read()
            .get(hive_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// A fixed list of hives with optional inspection dates.
#[derive(Debug, Clone, Default)]
pub struct StaticHiveDirectory {
    hives: BTreeMap<HiveId, Option<DateTime<Utc>>>,
}

impl StaticHiveDirectory {
    /// Creates a directory of the given hives.
    #[must_use]
    pub fn new(hive_ids: impl IntoIterator<Item = HiveId>) -> Self {
        Self {
            hives: hive_ids.into_iter().map(|id| (id, None)).collect(),
        }
    }

    /// Records the last inspection of a hive, adding the hive if needed.
    #[must_use]
    pub fn with_inspection(mut self, hive_id: HiveId, at: DateTime<Utc>) -> Self {
        self.hives.insert(hive_id, Some(at));
        self
    }

    /// Returns the number of hives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hives.len()
    }

    /// Returns true if the directory lists no hives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hives.is_empty()
    }
}

impl HiveDirectory for StaticHiveDirectory {
    fn hive_ids(&self) -> Result<Vec<HiveId>> {
        Ok(self.hives.keys().cloned().collect())
    }

    fn last_inspection(&self, hive_id: &HiveId) -> Option<DateTime<Utc>> {
        self.hives.get(hive_id).copied().flatten()
    }
}
