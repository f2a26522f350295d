//! Alert notifications for connection lifecycle events.
//!
//! Alerts are pushed into an unbounded channel and delivered to the
//! [`AlertSink`] by a dedicated task, so a slow or failing sink never stalls
//! the read, write, heartbeat or monitor loops.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::traits::AlertSink;

/// Severity of an [`Alert`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AlertLevel {
    #[strum(serialize = "warn")]
    Warning,
    Error,
}

/// Connection action an [`Alert`] refers to.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AlertAction {
    /// A connection was (or failed to be) established
    Connect,
    /// A reconnection attempt succeeded or failed
    Disconnect,
    /// An established connection was lost
    Close,
    /// The reconnection policy gave up; `connect` must be called again
    Exhausted,
}

/// A single notification for the embedding application.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub action: AlertAction,
    pub message: String,
}

impl Alert {
    #[must_use]
    pub fn new<S: Into<String>>(level: AlertLevel, action: AlertAction, message: S) -> Self {
        Self {
            level,
            action,
            message: message.into(),
        }
    }

    /// Whether this alert marks the end of automatic reconnection.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.action == AlertAction::Exhausted
    }
}

/// Fire-and-forget handle for emitting alerts.
///
/// Without a sink every alert is discarded.
#[derive(Debug, Clone, Default)]
pub(crate) struct Notifier {
    tx: Option<mpsc::UnboundedSender<Alert>>,
}

impl Notifier {
    /// Spawn the delivery task for `sink`.
    pub(crate) fn spawn(sink: Arc<dyn AlertSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Alert>();

        tokio::spawn(async move {
            while let Some(alert) = rx.recv().await {
                sink.send_alert(alert).await;
            }
        });

        Self { tx: Some(tx) }
    }

    pub(crate) fn notify<S: Into<String>>(
        &self,
        level: AlertLevel,
        action: AlertAction,
        message: S,
    ) {
        if let Some(tx) = &self.tx {
            _ = tx.send(Alert::new(level, action, message));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Recording(Mutex<Vec<Alert>>);

    #[async_trait]
    impl AlertSink for Recording {
        async fn send_alert(&self, alert: Alert) {
            self.0.lock().unwrap().push(alert);
        }
    }

    #[test]
    fn levels_and_actions_render_like_the_wire() {
        assert_eq!(AlertLevel::Warning.to_string(), "warn");
        assert_eq!(AlertLevel::Error.to_string(), "error");
        assert_eq!(AlertAction::Disconnect.to_string(), "disconnect");
        assert_eq!(AlertAction::Exhausted.to_string(), "exhausted");
    }

    #[tokio::test]
    async fn notifier_delivers_in_order() {
        let sink = Arc::new(Recording::default());
        let notifier = Notifier::spawn(Arc::clone(&sink) as Arc<dyn AlertSink>);

        notifier.notify(AlertLevel::Warning, AlertAction::Connect, "up");
        notifier.notify(AlertLevel::Error, AlertAction::Close, "down");

        tokio::time::sleep(Duration::from_millis(50)).await;

        let alerts = sink.0.lock().unwrap().clone();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].message, "up");
        assert_eq!(alerts[1].action, AlertAction::Close);
    }

    #[test]
    fn default_notifier_discards_alerts() {
        Notifier::default().notify(AlertLevel::Error, AlertAction::Exhausted, "ignored");
    }
}
