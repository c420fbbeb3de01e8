//! Threshold profile storage.
//!
//! [`ThresholdStore`] owns every configured [`ThresholdProfile`]: at most one
//! global profile and at most one override per hive. It applies no policy;
//! choosing which profile applies to a hive is the resolver's job.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::info;

use crate::error::{AlertError, Result};
use crate::types::{HiveId, ProfileScope, ThresholdLimits, ThresholdProfile};

/// Read access to configured threshold profiles.
///
/// Implemented by [`ThresholdStore`]; other implementations can front a
/// database or a remote settings service.
pub trait ThresholdSource: Send + Sync {
    /// Returns the override configured for a hive, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn hive_profile(&self, hive_id: &HiveId) -> Result<Option<ThresholdProfile>>;

    /// Returns the global profile, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn global_profile(&self) -> Result<Option<ThresholdProfile>>;
}

/// In-memory store of threshold profiles.
#[derive(Debug, Default)]
pub struct ThresholdStore {
    global: RwLock<Option<ThresholdProfile>>,
    hives: RwLock<HashMap<HiveId, ThresholdProfile>>,
}

impl ThresholdStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the global profile, updating it in place if one exists.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Configuration` if the limits are invalid. The
    /// stored profile is left unchanged in that case.
    pub fn set_global(&self, limits: ThresholdLimits) -> Result<ThresholdProfile> {
        limits.validate()?;

        let mut global = self.global.write();
        let profile = upsert(global.as_ref(), ProfileScope::Global, limits);
        *global = Some(profile.clone());

        info!(scope = %profile.scope, "saved threshold profile");
        Ok(profile)
    }

    /// Creates or updates the override for a hive.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Configuration` if the limits are invalid. The
    /// stored profile is left unchanged in that case.
    pub fn upsert_hive(
        &self,
        hive_id: &HiveId,
        limits: ThresholdLimits,
    ) -> Result<ThresholdProfile> {
        limits.validate()?;

        let mut hives = self.hives.write();
        let profile = upsert(
            hives.get(hive_id),
            ProfileScope::Hive(hive_id.clone()),
            limits,
        );
        hives.insert(hive_id.clone(), profile.clone());

        info!(scope = %profile.scope, "saved threshold profile");
        Ok(profile)
    }

    /// Removes the override for a hive.
    ///
    /// Returns the removed profile; resolution for the hive falls back to the
    /// global profile afterwards.
    pub fn delete_hive(&self, hive_id: &HiveId) -> Option<ThresholdProfile> {
        let removed = self.hives.write().remove(hive_id);
        if removed.is_some() {
            info!(hive_id = %hive_id, "removed hive threshold override");
        }
        removed
    }

    /// Removes the global profile.
    pub fn clear_global(&self) -> Option<ThresholdProfile> {
        let removed = self.global.write().take();
        if removed.is_some() {
            info!("removed global threshold profile");
        }
        removed
    }

    /// Returns the global profile.
    #[must_use]
    pub fn global(&self) -> Option<ThresholdProfile> {
        self.global.read().clone()
    }

    /// Returns the override for a hive.
    #[must_use]
    pub fn hive(&self, hive_id: &HiveId) -> Option<ThresholdProfile> {
        self.hives.read().get(hive_id).cloned()
    }

    /// Returns all hive overrides, ordered by hive ID.
    #[must_use]
    pub fn overrides(&self) -> Vec<ThresholdProfile> {
        let hives = self.hives.read();
        let mut profiles: Vec<_> = hives.values().cloned().collect();
        profiles.sort_by(|a, b| scope_key(&a.scope).cmp(scope_key(&b.scope)));
        profiles
    }

    /// Returns the number of hive overrides.
    #[must_use]
    pub fn override_count(&self) -> usize {
        self.hives.read().len()
    }

    /// Loads profiles in bulk, validating every one before storing any.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Configuration` if any profile is invalid or has
    /// the built-in scope.
    pub fn load(&self, profiles: Vec<ThresholdProfile>) -> Result<usize> {
        for profile in &profiles {
            profile.limits.validate()?;
            if profile.scope == ProfileScope::BuiltIn {
                return Err(AlertError::configuration(
                    "built-in profile cannot be stored",
                ));
            }
        }

        let count = profiles.len();
        for ThresholdProfile { scope, limits, .. } in profiles {
            match scope {
                ProfileScope::Global => {
                    self.set_global(limits)?;
                }
                ProfileScope::Hive(hive_id) => {
                    self.upsert_hive(&hive_id, limits)?;
                }
                ProfileScope::BuiltIn => {}
            }
        }
        Ok(count)
    }
}

impl ThresholdSource for ThresholdStore {
    fn hive_profile(&self, hive_id: &HiveId) -> Result<Option<ThresholdProfile>> {
        Ok(self.hive(hive_id))
    }

    fn global_profile(&self) -> Result<Option<ThresholdProfile>> {
        Ok(self.global())
    }
}

fn upsert(
    existing: Option<&ThresholdProfile>,
    scope: ProfileScope,
    limits: ThresholdLimits,
) -> ThresholdProfile {
    let now = Utc::now();
    ThresholdProfile {
        scope,
        limits,
        created_at: existing.map_or(now, |p| p.created_at),
        updated_at: now,
    }
}

fn scope_key(scope: &ProfileScope) -> &str {
    match scope {
        ProfileScope::Hive(id) => id.as_str(),
        ProfileScope::Global | ProfileScope::BuiltIn => "",
    }
}
