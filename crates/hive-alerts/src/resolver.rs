//! Effective threshold resolution.
//!
//! A hive override replaces the global profile entirely; the global profile
//! replaces the built-in defaults. There is no field-level inheritance.

use std::sync::Arc;

use tracing::debug;

use crate::error::{AlertError, Result};
use crate::store::ThresholdSource;
use crate::types::{HiveId, ThresholdProfile};

/// Computes the effective threshold profile for a hive.
#[derive(Debug)]
pub struct ThresholdResolver<S> {
    source: Arc<S>,
}

impl<S: ThresholdSource> ThresholdResolver<S> {
    /// Creates a resolver over a threshold source.
    #[must_use]
    pub const fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Returns the threshold source.
    #[must_use]
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Resolves the profile that applies to a hive.
    ///
    /// The source is queried on every call, so configuration changes apply to
    /// the next evaluation.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::ThresholdLookup` if the source cannot be read.
    pub fn resolve(&self, hive_id: &HiveId) -> Result<ThresholdProfile> {
        let lookup_failed = |e: AlertError| AlertError::ThresholdLookup {
            hive_id: hive_id.clone(),
            reason: e.to_string(),
        };

        if let Some(profile) = self.source.hive_profile(hive_id).map_err(lookup_failed)? {
            debug!(hive_id = %hive_id, scope = %profile.scope, "resolved hive override");
            return Ok(profile);
        }

        if let Some(profile) = self.source.global_profile().map_err(lookup_failed)? {
            debug!(hive_id = %hive_id, scope = %profile.scope, "resolved global profile");
            return Ok(profile);
        }

        debug!(hive_id = %hive_id, "no thresholds configured, using built-in defaults");
        Ok(ThresholdProfile::builtin())
    }
}

impl<S> Clone for ThresholdResolver<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}
