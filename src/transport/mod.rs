//! Core streaming TCP infrastructure.
//!
//! This module provides a generic connection manager that can be specialized
//! for different message protocols through the [`Dispatcher`] trait.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: TCP connection handler with heartbeat, reconnection,
//!   resubscription and a bounded asynchronous send queue
//! - [`frame`]: newline-delimited and length-prefixed framing
//! - [`codec`]: JSON or Snappy-compressed MessagePack encoding of frame payloads
//! - [`Dispatcher`]: routes every inbound frame
//! - [`EventHandler`] and [`AlertSink`]: callbacks into the embedding application
//!
//! # Example
//!
//! ```ignore
//! let connection = ConnectionManager::new(config, Arc::new(MyDispatcher), events, None);
//! connection.connect().await?;
//! ```

pub mod alert;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod subscription;
pub mod traits;

pub use alert::{Alert, AlertAction, AlertLevel};
pub use codec::{CodecError, Encoding};
pub use config::{Config, ReconnectBackoff, ReconnectConfig};
pub use connection::{ConnectionManager, ConnectionState};
#[expect(
    clippy::module_name_repetitions,
    reason = "TransportError includes module name for clarity when used outside this module"
)]
pub use error::TransportError;
pub use frame::{FrameCodec, Framing};
pub use subscription::{ActiveSubscription, SubscriptionSet};
pub use traits::*;
