//! Input files read by the CLI.
//!
//! Samples file (JSON):
//!
//! ```json
//! {
//!   "hives": [
//!     {
//!       "hive_id": "apiary-1/hive-3",
//!       "last_inspection": "2026-10-01T09:00:00Z",
//!       "samples": [
//!         { "temperature": 39.2, "battery_level": 64.0, "recorded_at": "2026-10-16T08:00:00Z" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Profiles file (JSON): an optional `global` limits object and a `hives` map
//! from hive ID to a full set of limits.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hive_alerts::{
    AlertError, EngineConfig, HiveDirectory, HiveId, InMemorySampleSource, SampleSource,
    SensorSample, StaticHiveDirectory, ThresholdLimits, ThresholdStore,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CliError;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Input(format!("failed to read '{}': {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| CliError::Input(format!("failed to parse '{}': {e}", path.display())))
}

// ============ Samples ============

/// One hive's entry in a samples file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiveRecord {
    /// The hive the samples belong to.
    pub hive_id: HiveId,
    /// When the hive was last inspected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_inspection: Option<DateTime<Utc>>,
    /// Recorded samples, in any order.
    #[serde(default)]
    pub samples: Vec<SensorSample>,
}

/// Contents of a samples file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleFile {
    /// Hives and their readings.
    #[serde(default)]
    pub hives: Vec<HiveRecord>,
}

impl SampleFile {
    /// Reads a samples file.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Input` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        read_json(path)
    }

    /// Returns the samples recorded for a hive, oldest first.
    ///
    /// Entries for the same hive are merged.
    #[must_use]
    pub fn samples_for(&self, hive_id: &HiveId) -> Vec<SensorSample> {
        let mut samples: Vec<SensorSample> = self
            .hives
            .iter()
            .filter(|record| &record.hive_id == hive_id)
            .flat_map(|record| record.samples.iter().cloned())
            .collect();
        samples.sort_by_key(|s| s.recorded_at);
        samples
    }

    /// Returns the latest inspection date recorded for a hive.
    #[must_use]
    pub fn last_inspection(&self, hive_id: &HiveId) -> Option<DateTime<Utc>> {
        self.hives
            .iter()
            .filter(|record| &record.hive_id == hive_id)
            .filter_map(|record| record.last_inspection)
            .max()
    }

    /// Returns every hive in the file, sorted and without duplicates.
    #[must_use]
    pub fn hive_ids(&self) -> Vec<HiveId> {
        let mut ids: Vec<HiveId> = self.hives.iter().map(|r| r.hive_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Loads the file into an in-memory source and directory.
    #[must_use]
    pub fn into_sources(self) -> (InMemorySampleSource, StaticHiveDirectory) {
        let source = InMemorySampleSource::new();
        let mut directory = StaticHiveDirectory::new(self.hive_ids());
        for hive_id in self.hive_ids() {
            source.set_samples(&hive_id, self.samples_for(&hive_id));
            if let Some(at) = self.last_inspection(&hive_id) {
                directory = directory.with_inspection(hive_id, at);
            }
        }
        (source, directory)
    }
}

/// A samples file that is re-read at the start of every sweep.
///
/// Listing hives reloads the file; per-hive lookups during the same sweep
/// are served from that snapshot.
#[derive(Debug)]
pub struct SampleFileSource {
    path: PathBuf,
    snapshot: RwLock<SampleFile>,
}

impl SampleFileSource {
    /// Creates a source for the file, reading it once to check it parses.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Input` if the file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CliError> {
        let path = path.into();
        let snapshot = SampleFile::from_file(&path)?;
        Ok(Self {
            path,
            snapshot: RwLock::new(snapshot),
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reload(&self) -> hive_alerts::Result<()> {
        let file = SampleFile::from_file(&self.path).map_err(|e| {
            AlertError::SourceUnavailable {
                reason: e.to_string(),
            }
        })?;
        debug!(path = %self.path.display(), hives = file.hives.len(), "reloaded samples file");
        *self.snapshot.write() = file;
        Ok(())
    }
}

impl SampleSource for SampleFileSource {
    fn samples(&self, hive_id: &HiveId) -> hive_alerts::Result<Vec<SensorSample>> {
        Ok(self.snapshot.read().samples_for(hive_id))
    }
}

impl HiveDirectory for SampleFileSource {
    fn hive_ids(&self) -> hive_alerts::Result<Vec<HiveId>> {
        self.reload()?;
        Ok(self.snapshot.read().hive_ids())
    }

    fn last_inspection(&self, hive_id: &HiveId) -> Option<DateTime<Utc>> {
        self.snapshot.read().last_inspection(hive_id)
    }
}

// ============ Profiles ============

/// Contents of a profiles file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileFile {
    /// Limits for every hive without an override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<ThresholdLimits>,
    /// Per-hive overrides.
    #[serde(default)]
    pub hives: BTreeMap<HiveId, ThresholdLimits>,
}

impl ProfileFile {
    /// Reads a profiles file.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Input` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        read_json(path)
    }

    /// Installs the profiles into a store.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Engine` if any set of limits is invalid.
    pub fn apply(&self, store: &ThresholdStore) -> Result<(), CliError> {
        if let Some(global) = &self.global {
            store.set_global(global.clone())?;
        }
        for (hive_id, limits) in &self.hives {
            store.upsert_hive(hive_id, limits.clone())?;
        }
        Ok(())
    }
}

// ============ Configuration ============

/// Loads the engine configuration, or the defaults when no path is given.
///
/// # Errors
///
/// Returns `CliError::Engine` if the file cannot be read or is invalid.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    match path {
        Some(path) => {
            let config = EngineConfig::from_file(path)?;
            debug!(path = %path.display(), "loaded engine config");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Builds a threshold store from the config's global limits and an optional
/// profiles file. The profiles file wins where both set the global profile.
///
/// # Errors
///
/// Returns an error if the profiles file cannot be read or holds invalid limits.
pub fn build_store(
    config: &EngineConfig,
    profiles: Option<&Path>,
) -> Result<ThresholdStore, CliError> {
    let store = ThresholdStore::new();
    if let Some(global) = &config.global_thresholds {
        store.set_global(global.clone())?;
    }
    if let Some(path) = profiles {
        ProfileFile::from_file(path)?.apply(&store)?;
    }
    Ok(store)
}
