//! Threshold resolution and alert lifecycle engine for HiveWatch.
//!
//! `hive-alerts` decides, for every monitored hive, which threshold limits
//! apply, whether a sensor reading breaches them, and whether a breach opens
//! a new alert or is already covered by an active one.
//!
//! # Features
//!
//! - **Layered thresholds**: a per-hive override replaces the global profile,
//!   which replaces the built-in defaults
//! - **Configurable severity**: breach magnitude maps to severity through a
//!   [`SeverityPolicy`] table
//! - **Deduplicated alerts**: at most one unresolved alert per hive and alert
//!   type, enforced inside the [`AlertLedger`]
//! - **Sweeps**: multi-hive evaluation where one failing hive never aborts the rest
//! - **Scheduling**: on-demand, queued, and periodic checks on tokio
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use hive_alerts::{
//!     AlertLedger, AlertLifecycleManager, AlertType, HiveId, SensorSample, ThresholdStore,
//! };
//!
//! let store = Arc::new(ThresholdStore::new());
//! let manager = AlertLifecycleManager::new(store, AlertLedger::new());
//!
//! let hive = HiveId::new("apiary-1/hive-3").unwrap();
//! let sample = SensorSample::now().with_temperature(45.0);
//!
//! // The first evaluation opens an alert; repeats are suppressed.
//! let created = manager.evaluate(&hive, &sample).unwrap();
//! assert_eq!(created.len(), 1);
//! assert_eq!(created[0].alert_type, AlertType::Temperature);
//! assert!(manager.evaluate(&hive, &sample).unwrap().is_empty());
//!
//! // Resolving lets the next breach open a fresh alert.
//! manager.resolve(&created[0].id, "beekeeper", None).unwrap();
//! assert_eq!(manager.evaluate(&hive, &sample).unwrap().len(), 1);
//! ```
//!
//! # Overriding thresholds
//!
//! ```rust
//! use std::sync::Arc;
//! use hive_alerts::{HiveId, ProfileScope, ThresholdLimits, ThresholdResolver, ThresholdStore};
//!
//! let store = Arc::new(ThresholdStore::new());
//! let resolver = ThresholdResolver::new(Arc::clone(&store));
//! let hive = HiveId::new("hive-7").unwrap();
//!
//! store
//!     .upsert_hive(
//!         &hive,
//!         ThresholdLimits {
//!             temperature_min: 30.0,
//!             temperature_max: 36.0,
//!             ..ThresholdLimits::default()
//!         },
//!     )
//!     .unwrap();
//!
//! let profile = resolver.resolve(&hive).unwrap();
//! assert_eq!(profile.scope, ProfileScope::Hive(hive));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod detector;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod notify;
pub mod resolver;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use config::{EngineConfig, LifecycleConfig, SchedulerConfig};
pub use detector::{AnomalyDetector, Finding, LimitKind, SeverityBand, SeverityPolicy};
pub use error::{AlertError, Result};
pub use ledger::{AlertFilter, AlertLedger, AlertSummary};
pub use lifecycle::{
    AlertLifecycleManager, EvaluationResult, HiveFailure, HiveReadings, SweepStatus,
};
pub use notify::{AlertEvent, AlertNotifier, ChannelNotifier, LogNotifier};
pub use resolver::ThresholdResolver;
pub use scheduler::{CheckScheduler, CheckTask, TaskId, TaskState};
pub use source::{HiveDirectory, InMemorySampleSource, SampleSource, StaticHiveDirectory};
pub use store::{ThresholdSource, ThresholdStore};
pub use types::{
    Alert, AlertId, AlertSeverity, AlertType, HiveId, Metric, NewAlert, ProfileScope,
    SensorSample, ThresholdLimits, ThresholdProfile, TriggerValue, TriggerValues,
};
