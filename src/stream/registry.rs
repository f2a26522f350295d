use std::any::type_name;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use dashmap::DashMap;
use serde::de::DeserializeOwned;

use super::error::{DispatchError, HandlerError};
use super::types::request::{Heartbeat, MessageType};
use super::types::response::Envelope;
use crate::transport::{Dispatcher, Encoding};

type Route = Arc<dyn Fn(&Envelope) -> Result<(), DispatchError> + Send + Sync>;

struct Registration {
    route: Route,
    /// Name of the payload type for typed handlers
    shape: Option<&'static str>,
}

/// Routes inbound envelopes to handlers by message type.
///
/// Registering a type twice replaces the earlier handler. The default handler
/// only receives envelopes whose type has no handler of its own.
///
/// # Example
///
/// ```
/// use trading_bridge_sdk::stream::{HandlerRegistry, MessageType, Tick};
///
/// let registry = HandlerRegistry::new();
/// registry.register_typed_handler(MessageType::Tick, |ticks: Vec<Tick>| {
///     for tick in ticks {
///         println!("{} {}/{}", tick.symbol, tick.bid, tick.ask);
///     }
///     Ok(())
/// });
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<MessageType, Registration>,
    default: RwLock<Option<Route>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle envelopes of `message_type` with access to the raw envelope.
    pub fn register_handler<F>(&self, message_type: MessageType, handler: F)
    where
        F: Fn(&Envelope) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let tag = message_type.clone();
        let route: Route = Arc::new(move |envelope| {
            handler(envelope).map_err(|source| DispatchError::Handler {
                message_type: tag.clone(),
                source,
            })
        });

        self.handlers.insert(message_type, Registration { route, shape: None });
    }

    /// Handle envelopes of `message_type` whose payload decodes into `T`.
    ///
    /// A payload that does not match `T` is reported as
    /// [`DispatchError::PayloadDecode`] and the handler is not invoked.
    pub fn register_typed_handler<T, F>(&self, message_type: MessageType, handler: F)
    where
        T: DeserializeOwned,
        F: Fn(T) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let tag = message_type.clone();
        let route: Route = Arc::new(move |envelope| {
            let payload =
                T::deserialize(&envelope.payload).map_err(|source| DispatchError::PayloadDecode {
                    message_type: tag.clone(),
                    source,
                })?;

            handler(payload).map_err(|source| DispatchError::Handler {
                message_type: tag.clone(),
                source,
            })
        });

        self.handlers.insert(
            message_type,
            Registration {
                route,
                shape: Some(type_name::<T>()),
            },
        );
    }

    /// Handle every envelope whose type has no registered handler.
    pub fn set_default_handler<F>(&self, handler: F)
    where
        F: Fn(&Envelope) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let route: Route = Arc::new(move |envelope| {
            handler(envelope).map_err(|source| DispatchError::Handler {
                message_type: envelope.message_type.clone(),
                source,
            })
        });

        *self.default.write().unwrap_or_else(PoisonError::into_inner) = Some(route);
    }

    /// Remove the handler of `message_type`, returning whether one existed.
    pub fn unregister(&self, message_type: &MessageType) -> bool {
        self.handlers.remove(message_type).is_some()
    }

    pub fn clear_default_handler(&self) {
        self.default
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    #[must_use]
    pub fn is_registered(&self, message_type: &MessageType) -> bool {
        self.handlers.contains_key(message_type)
    }

    /// Registered message types, without the default handler.
    #[must_use]
    pub fn registered_types(&self) -> Vec<MessageType> {
        self.handlers.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Payload type name the handler of `message_type` decodes into, if typed.
    #[must_use]
    pub fn payload_shape(&self, message_type: &MessageType) -> Option<&'static str> {
        self.handlers.get(message_type).and_then(|entry| entry.shape)
    }

    /// Route a decoded envelope.
    pub fn route(&self, envelope: &Envelope) -> Result<(), DispatchError> {
        if !envelope.is_ok() {
            return Err(DispatchError::ServerError {
                message_type: envelope.message_type.clone(),
                status: envelope.status.clone(),
            });
        }

        // Clone the route out so a handler may (un)register without deadlocking
        let route = self
            .handlers
            .get(&envelope.message_type)
            .map(|entry| Arc::clone(&entry.route))
            .or_else(|| {
                self.default
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            })
            .ok_or_else(|| DispatchError::NoHandler(envelope.message_type.clone()))?;

        route(envelope)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let has_default = self
            .default
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();

        f.debug_struct("HandlerRegistry")
            .field("types", &self.registered_types())
            .field("default", &has_default)
            .finish()
    }
}

impl Dispatcher for HandlerRegistry {
    fn dispatch(&self, payload: &[u8], encoding: Encoding) -> crate::Result<()> {
        let envelope: Envelope = encoding
            .decode(payload)
            .map_err(DispatchError::MalformedEnvelope)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(message_type = %envelope.message_type, "Dispatching envelope");

        self.route(&envelope)?;
        Ok(())
    }

    fn heartbeat(&self, encoding: Encoding) -> Option<Bytes> {
        encoding.encode(&Heartbeat::now()).ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal_macros::dec;

    use super::*;
    use crate::error::Kind;
    use crate::stream::types::response::Tick;

    const TICK_FRAME: &[u8] = br#"{"status":"ok","type":"tick","timestamp":1,"payload":[{"symbol":"EURUSD","ask":"1.1","bid":"1.0","last":"1.05","volume":3,"time":1}]}"#;

    #[test]
    fn typed_handler_receives_decoded_payload() {
        let registry = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.register_typed_handler(MessageType::Tick, move |ticks: Vec<Tick>| {
            sink.lock().unwrap().extend(ticks);
            Ok(())
        });

        registry.dispatch(TICK_FRAME, Encoding::Json).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].ask, dec!(1.1));
        assert_eq!(
            registry.payload_shape(&MessageType::Tick),
            Some(type_name::<Vec<Tick>>())
        );
    }

    #[test]
    fn error_status_never_reaches_handler() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        registry.register_handler(MessageType::Order, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = registry
            .dispatch(
                br#"{"status":"not authorized","type":"order","timestamp":1}"#,
                Encoding::Json,
            )
            .unwrap_err();

        assert_eq!(err.kind(), Kind::Protocol);
        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::ServerError { status, .. }) if status == "not authorized"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn default_handler_catches_unmatched_types() {
        let registry = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.set_default_handler(move |envelope| {
            sink.lock().unwrap().push(envelope.message_type.clone());
            Ok(())
        });
        registry.register_handler(MessageType::Deal, |_| Ok(()));

        registry
            .dispatch(br#"{"status":"ok","type":"balance","timestamp":1}"#, Encoding::Json)
            .unwrap();
        registry
            .dispatch(br#"{"status":"ok","type":"deal","timestamp":1}"#, Encoding::Json)
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![MessageType::Other("balance".to_owned())]
        );
    }

    #[test]
    fn missing_handler_is_an_error() {
        let registry = HandlerRegistry::new();

        let err = registry
            .dispatch(br#"{"status":"ok","type":"stop_out","timestamp":1}"#, Encoding::Json)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::NoHandler(MessageType::StopOut))
        ));
    }

    #[test]
    fn payload_mismatch_is_a_decode_error() {
        let registry = HandlerRegistry::new();
        registry.register_typed_handler(MessageType::Tick, |_: Vec<Tick>| Ok(()));

        let err = registry
            .dispatch(
                br#"{"status":"ok","type":"tick","timestamp":1,"payload":{"symbol":1}}"#,
                Encoding::Json,
            )
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::PayloadDecode { .. })
        ));
    }

    #[test]
    fn malformed_envelope_is_reported() {
        let registry = HandlerRegistry::new();

        let err = registry.dispatch(b"not json", Encoding::Json).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn registering_twice_replaces_and_unregister_removes() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&calls);
        let second = Arc::clone(&calls);
        registry.register_handler(MessageType::Position, move |_| {
            first.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        registry.register_handler(MessageType::Position, move |_| {
            second.fetch_add(100, Ordering::SeqCst);
            Ok(())
        });

        registry
            .dispatch(br#"{"status":"ok","type":"position","timestamp":1}"#, Encoding::Json)
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 100);
        assert_eq!(registry.registered_types(), vec![MessageType::Position]);

        assert!(registry.unregister(&MessageType::Position), "was registered");
        assert!(registry.registered_types().is_empty(), "nothing left");
    }

    #[test]
    fn handler_failure_is_wrapped() {
        let registry = HandlerRegistry::new();
        registry.register_handler(MessageType::MarginCall, |_| Err("account locked".into()));

        let err = registry
            .dispatch(br#"{"status":"ok","type":"margin_call","timestamp":1}"#, Encoding::Json)
            .unwrap_err();

        assert!(
            err.to_string().contains("account locked"),
            "unexpected message: {err}"
        );
    }

    #[test]
    fn msgpack_snappy_envelope_reaches_typed_handler() {
        let registry = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.register_typed_handler(MessageType::Tick, move |ticks: Vec<Tick>| {
            sink.lock().unwrap().extend(ticks);
            Ok(())
        });
        let envelope: Envelope = Encoding::Json.decode(TICK_FRAME).unwrap();
        let frame = Encoding::MsgpackSnappy.encode(&envelope).unwrap();

        registry.dispatch(&frame, Encoding::MsgpackSnappy).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].symbol, "EURUSD");
        assert_eq!(seen[0].bid, dec!(1.0));
    }

    #[test]
    fn json_frame_on_binary_connection_is_malformed() {
        let registry = HandlerRegistry::new();
        registry.register_handler(MessageType::Tick, |_| Ok(()));

        let err = registry
            .dispatch(TICK_FRAME, Encoding::MsgpackSnappy)
            .unwrap_err();

        assert_eq!(err.kind(), Kind::Protocol);
        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn heartbeat_uses_connection_encoding() {
        let registry = HandlerRegistry::new();

        let json = registry.heartbeat(Encoding::Json).unwrap();
        let binary = registry.heartbeat(Encoding::MsgpackSnappy).unwrap();

        let from_json: serde_json::Value = Encoding::Json.decode(&json).unwrap();
        let from_binary: serde_json::Value = Encoding::MsgpackSnappy.decode(&binary).unwrap();
        assert_eq!(from_json["type"], "heartbeat");
        assert_eq!(from_binary["type"], "heartbeat");
        assert!(from_binary["time"].is_string(), "time is an RFC 3339 string");
    }

    #[test]
    fn handler_registered_under_spelled_out_tag_matches() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        registry.register_handler(MessageType::Other("tick".to_owned()), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.dispatch(TICK_FRAME, Encoding::Json).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_registered(&MessageType::Tick), "same wire tag");
    }
}
