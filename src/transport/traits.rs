//! Core traits at the seams between the connection and the embedding application.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::alert::Alert;
use super::codec::Encoding;
use crate::error::Error;

/// Routes the payload of every inbound frame.
///
/// Called from the read loop in arrival order with the [`Encoding`] of the
/// connection's framing. An error is reported through
/// [`EventHandler::on_error`] and never terminates the connection.
///
/// # Example
///
/// ```ignore
/// struct Echo;
///
/// impl Dispatcher for Echo {
///     fn dispatch(&self, payload: &[u8], encoding: Encoding) -> crate::Result<()> {
///         let value: serde_json::Value = encoding.decode(payload)?;
///         println!("{value}");
///         Ok(())
///     }
/// }
/// ```
pub trait Dispatcher: Send + Sync + 'static {
    fn dispatch(&self, payload: &[u8], encoding: Encoding) -> crate::Result<()>;

    /// Payload sent on every heartbeat tick, encoded with `encoding`. `None` skips the tick.
    fn heartbeat(&self, encoding: Encoding) -> Option<Bytes> {
        let _ = encoding;
        None
    }
}

/// Connection lifecycle callbacks.
///
/// All methods default to no-ops. Callbacks run on the loop that observed the
/// event and must not block.
pub trait EventHandler: Send + Sync + 'static {
    /// A connection (initial or re-established) is ready.
    fn on_connected(&self) {}

    /// The client was disconnected on request.
    fn on_disconnected(&self) {}

    /// A connection, protocol or dispatch error occurred.
    fn on_error(&self, error: &Error) {
        let _ = error;
    }
}

/// Receiver of out-of-band alerts (severity, action, message).
#[async_trait]
pub trait AlertSink: Send + Sync + 'static {
    async fn send_alert(&self, alert: Alert);
}

type Callback = Arc<dyn Fn() + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// [`EventHandler`] assembled from optional closures.
///
/// ```
/// use trading_bridge_sdk::transport::FnEventHandler;
///
/// let events = FnEventHandler::default()
///     .with_connected(|| println!("connected"))
///     .with_error(|e| eprintln!("error: {e}"));
/// ```
#[derive(Clone, Default)]
pub struct FnEventHandler {
    connected: Option<Callback>,
    disconnected: Option<Callback>,
    error: Option<ErrorCallback>,
}

impl FnEventHandler {
    #[must_use]
    pub fn with_connected<F: Fn() + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.connected = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_disconnected<F: Fn() + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.disconnected = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_error<F: Fn(&Error) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.error = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for FnEventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEventHandler")
            .field("connected", &self.connected.is_some())
            .field("disconnected", &self.disconnected.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

impl EventHandler for FnEventHandler {
    fn on_connected(&self) {
        if let Some(f) = &self.connected {
            f();
        }
    }

    fn on_disconnected(&self) {
        if let Some(f) = &self.disconnected {
            f();
        }
    }

    fn on_error(&self, error: &Error) {
        if let Some(f) = &self.error {
            f(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn fn_event_handler_invokes_registered_closures() {
        let hits = Arc::new(AtomicUsize::new(0));
        let connected = Arc::clone(&hits);
        let errored = Arc::clone(&hits);

        let events = FnEventHandler::default()
            .with_connected(move || {
                connected.fetch_add(1, Ordering::SeqCst);
            })
            .with_error(move |_| {
                errored.fetch_add(10, Ordering::SeqCst);
            });

        events.on_connected();
        events.on_disconnected();
        events.on_error(&Error::validation("boom"));

        assert_eq!(hits.load(Ordering::SeqCst), 11);
    }
}
