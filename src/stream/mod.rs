#![expect(
    clippy::module_name_repetitions,
    reason = "Re-exported names intentionally match their modules for API clarity"
)]

//! Streaming client for server-pushed market data and trading events.
//!
//! The server pushes one [`Envelope`] per frame. Each envelope carries a
//! [`MessageType`] tag and a payload that is decoded only once a handler for
//! the tag is found.
//!
//! # Available Streams
//!
//! - **Ticks**: bid/ask/last prices per symbol
//! - **Positions**, **Orders**, **Deals**: trading account activity
//! - **Margin calls** and **Stop outs**: risk events
//! - **User adds**: newly created trading accounts
//!
//! # Example
//!
//! ```rust, no_run
//! use trading_bridge_sdk::stream::{Client, MessageType, Position};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::default();
//!
//!     client.register_typed_handler(MessageType::Position, |positions: Vec<Position>| {
//!         println!("{} position update(s)", positions.len());
//!         Ok(())
//!     });
//!     client.subscribe_positions().await?;
//!     client.connect().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod registry;
pub mod types;

pub use client::Client;
pub use error::{DispatchError, HandlerError};
pub use registry::HandlerRegistry;
pub use types::request::{
    Heartbeat, MessageType, SubscriptionAction, SubscriptionParams, SubscriptionRequest,
};
pub use types::response::{
    Deal, Envelope, HeartbeatAck, MarginCall, Order, Position, StopOut, Tick, UserAdd,
};
