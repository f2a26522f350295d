use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::request::MessageType;
use crate::types::Decimal;

/// Status value of a successful envelope.
pub const STATUS_OK: &str = "ok";

/// Top-level wrapper of every inbound frame.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Builder)]
pub struct Envelope {
    /// `ok` on success, otherwise a description of the error
    pub status: String,
    /// Message type of the payload
    #[serde(rename = "type")]
    #[builder(into)]
    pub message_type: MessageType,
    /// Type specific payload, decoded once a handler is matched
    #[serde(default)]
    #[builder(default)]
    pub payload: Value,
    /// Unix timestamp in milliseconds
    #[serde(default)]
    #[builder(default)]
    pub timestamp: i64,
}

impl Envelope {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Price tick.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Builder)]
pub struct Tick {
    #[builder(into)]
    pub symbol: String,
    pub ask: Decimal,
    pub bid: Decimal,
    pub last: Decimal,
    #[serde(default)]
    #[builder(default)]
    pub volume: u64,
    /// Unix timestamp in milliseconds
    pub time: i64,
}

/// Open position of a trading account.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Builder)]
pub struct Position {
    /// Position ticket
    pub position: u64,
    pub login: u64,
    #[builder(into)]
    pub symbol: String,
    /// Trade direction as reported by the trading server (0 buy, 1 sell)
    #[serde(default)]
    #[builder(default)]
    pub action: u32,
    pub volume: Decimal,
    pub price_open: Decimal,
    #[serde(default)]
    #[builder(default)]
    pub price_current: Decimal,
    #[serde(default)]
    #[builder(default)]
    pub sl: Decimal,
    #[serde(default)]
    #[builder(default)]
    pub tp: Decimal,
    #[serde(default)]
    #[builder(default)]
    pub profit: Decimal,
    /// Unix timestamp in milliseconds
    #[serde(default)]
    #[builder(default)]
    pub time: i64,
}

/// Pending order.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Builder)]
pub struct Order {
    /// Order ticket
    pub order: u64,
    pub login: u64,
    #[builder(into)]
    pub symbol: String,
    /// Order type as reported by the trading server
    #[serde(rename = "type", default)]
    #[builder(default)]
    pub order_type: u32,
    /// Order state as reported by the trading server
    #[serde(default)]
    #[builder(default)]
    pub state: u32,
    pub volume: Decimal,
    pub price_order: Decimal,
    #[serde(default)]
    #[builder(default)]
    pub sl: Decimal,
    #[serde(default)]
    #[builder(default)]
    pub tp: Decimal,
    /// Unix timestamp in milliseconds
    #[serde(default)]
    #[builder(default)]
    pub time: i64,
}

/// Executed deal.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Builder)]
pub struct Deal {
    /// Deal ticket
    pub deal: u64,
    pub login: u64,
    /// Position the deal belongs to
    #[serde(default)]
    #[builder(default)]
    pub position: u64,
    #[builder(into)]
    pub symbol: String,
    #[serde(default)]
    #[builder(default)]
    pub action: u32,
    /// Deal entry (in, out, in/out) as reported by the trading server
    #[serde(default)]
    #[builder(default)]
    pub entry: u32,
    pub volume: Decimal,
    pub price: Decimal,
    #[serde(default)]
    #[builder(default)]
    pub profit: Decimal,
    /// Unix timestamp in milliseconds
    #[serde(default)]
    #[builder(default)]
    pub time: i64,
}

/// Margin call raised for an account.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Builder)]
pub struct MarginCall {
    pub login: u64,
    pub margin_level: Decimal,
    pub equity: Decimal,
    #[serde(default)]
    #[builder(default)]
    pub margin: Decimal,
    /// Unix timestamp in milliseconds
    #[serde(default)]
    #[builder(default)]
    pub time: i64,
}

/// Stop out executed for an account.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Builder)]
pub struct StopOut {
    pub login: u64,
    pub margin_level: Decimal,
    pub equity: Decimal,
    #[serde(default)]
    #[builder(default)]
    pub margin: Decimal,
    /// Unix timestamp in milliseconds
    #[serde(default)]
    #[builder(default)]
    pub time: i64,
}

/// Newly created trading account.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Builder)]
pub struct UserAdd {
    pub login: u64,
    #[builder(into)]
    pub group: String,
    #[serde(default)]
    #[builder(default)]
    pub name: String,
}

/// Server answer to a heartbeat.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Builder)]
pub struct HeartbeatAck {
    #[builder(into)]
    pub server_time: String,
    pub timestamp: i64,
    /// Server uptime in seconds
    #[serde(default)]
    #[builder(default)]
    pub uptime: i64,
    #[serde(default)]
    #[builder(default)]
    pub active_clients: u32,
}
