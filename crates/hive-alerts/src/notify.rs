//! Alert event delivery.
//!
//! The lifecycle manager reports every created and resolved alert to its
//! registered [`AlertNotifier`]s. Delivery is fire-and-forget: a notifier that
//! fails is logged and skipped, and nothing waits on a slow consumer.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{AlertError, Result};
use crate::types::{Alert, AlertSeverity};

/// Something that happened to an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "alert", rename_all = "lowercase")]
pub enum AlertEvent {
    /// A new alert was raised.
    Created(Alert),
    /// An alert was resolved.
    Resolved(Alert),
}

impl AlertEvent {
    /// Returns the alert the event is about.
    #[must_use]
    pub const fn alert(&self) -> &Alert {
        match self {
            Self::Created(alert) | Self::Resolved(alert) => alert,
        }
    }

    /// Returns the event kind as a string.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Resolved(_) => "resolved",
        }
    }
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alert = self.alert();
        write!(
            f,
            "{} {} alert for hive {} ({})",
            self.kind(),
            alert.alert_type,
            alert.hive_id,
            alert.severity
        )
    }
}

/// Receives alert events.
///
/// Implementations must return quickly; anything slow belongs behind a
/// channel such as [`ChannelNotifier`].
pub trait AlertNotifier: Send + Sync + fmt::Debug {
    /// Returns the name of this notifier.
    fn name(&self) -> &str;

    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Notification` if the event cannot be delivered.
    fn notify(&self, event: &AlertEvent) -> Result<()>;
}

/// Writes alert events to the tracing log.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    name: String,
}

impl LogNotifier {
    /// Creates a log notifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new("log")
    }
}

impl AlertNotifier for LogNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn notify(&self, event: &AlertEvent) -> Result<()> {
        let alert = event.alert();
        match event {
            AlertEvent::Created(_) if alert.severity >= AlertSeverity::High => {
                warn!(
                    alert_id = %alert.id,
                    hive_id = %alert.hive_id,
                    alert_type = %alert.alert_type,
                    severity = %alert.severity,
                    message = %alert.message,
                    "ALERT"
                );
            }
            AlertEvent::Created(_) => {
                info!(
                    alert_id = %alert.id,
                    hive_id = %alert.hive_id,
                    alert_type = %alert.alert_type,
                    severity = %alert.severity,
                    message = %alert.message,
                    "ALERT"
                );
            }
            AlertEvent::Resolved(_) => {
                info!(
                    alert_id = %alert.id,
                    hive_id = %alert.hive_id,
                    alert_type = %alert.alert_type,
                    resolved_by = ?alert.resolved_by,
                    "RESOLVED"
                );
            }
        }
        Ok(())
    }
}

/// Forwards alert events into an unbounded tokio channel.
///
/// Sending never blocks; the receiver drains events at its own pace.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    name: String,
    sender: mpsc::UnboundedSender<AlertEvent>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiver its events arrive on.
    #[must_use]
    pub fn new(name: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<AlertEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                name: name.into(),
                sender,
            },
            receiver,
        )
    }
}

impl AlertNotifier for ChannelNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn notify(&self, event: &AlertEvent) -> Result<()> {
        self.sender
            .send(event.clone())
            .map_err(|_| AlertError::Notification {
                reason: format!("receiver for notifier '{}' was dropped", self.name),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertType, HiveId, NewAlert};

    fn test_alert() -> Alert {
        Alert::new(NewAlert::new(
            HiveId::new("hive-1").unwrap(),
            AlertType::Temperature,
            AlertSeverity::High,
            "Temperature 45.0°C is above the maximum of 38.0°C",
        ))
    }

    mod event_tests {
        use super::*;

        #[test]
        fn event_kind_and_alert() {
            let alert = test_alert();
            let event = AlertEvent::Created(alert.clone());
            assert_eq!(event.kind(), "created");
            assert_eq!(event.alert(), &alert);
        }

        #[test]
        fn event_display() {
            let event = AlertEvent::Created(test_alert());
            assert_eq!(
                event.to_string(),
                "created temperature alert for hive hive-1 (high)"
            );
        }

        #[test]
        fn event_serializes_tagged() {
            let event = AlertEvent::Resolved(test_alert());
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], "resolved");
            assert_eq!(json["alert"]["hive_id"], "hive-1");
        }
    }

    mod notifier_tests {
        use super::*;

        #[test]
        fn log_notifier_accepts_events() {
            let notifier = LogNotifier::default();
            assert_eq!(notifier.name(), "log");
            assert!(notifier.notify(&AlertEvent::Created(test_alert())).is_ok());
            assert!(notifier.notify(&AlertEvent::Resolved(test_alert())).is_ok());
        }

        #[test]
        fn channel_notifier_forwards_events() {
            let (notifier, mut rx) = ChannelNotifier::new("test");
            let event = AlertEvent::Created(test_alert());
            notifier.notify(&event).unwrap();

            assert_eq!(rx.try_recv().unwrap(), event);
            assert!(rx.try_recv().is_err());
        }

        #[test]
        fn channel_notifier_fails_without_receiver() {
            let (notifier, rx) = ChannelNotifier::new("test");
            drop(rx);

            let result = notifier.notify(&AlertEvent::Created(test_alert()));
            assert!(matches!(result, Err(AlertError::Notification { .. })));
        }
    }
}
