use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use bon::Builder;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_with::{
    DeserializeFromStr, SerializeDisplay, StringWithSeparator, formats::CommaSeparator, serde_as,
    skip_serializing_none,
};

/// Message type tag carried by requests and envelopes.
///
/// Tags unknown to this crate are kept verbatim in [`MessageType::Other`].
/// Equality and hashing follow the wire tag, so `Other("tick")` and
/// [`MessageType::Tick`] name the same type.
#[non_exhaustive]
#[derive(Debug, Clone, SerializeDisplay, DeserializeFromStr)]
pub enum MessageType {
    Tick,
    Position,
    Order,
    Deal,
    MarginCall,
    StopOut,
    Heartbeat,
    UserAdd,
    Other(String),
}

impl MessageType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tick => "tick",
            Self::Position => "position",
            Self::Order => "order",
            Self::Deal => "deal",
            Self::MarginCall => "margin_call",
            Self::StopOut => "stop_out",
            Self::Heartbeat => "heartbeat",
            Self::UserAdd => "user_add",
            Self::Other(tag) => tag,
        }
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "tick" => Self::Tick,
            "position" => Self::Position,
            "order" => Self::Order,
            "deal" => Self::Deal,
            "margin_call" => Self::MarginCall,
            "stop_out" => Self::StopOut,
            "heartbeat" => Self::Heartbeat,
            "user_add" => Self::UserAdd,
            other => Self::Other(other.to_owned()),
        })
    }
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(message_type) => message_type,
            Err(never) => match never {},
        }
    }
}

/// Subscription request message.
///
/// ```
/// use trading_bridge_sdk::stream::SubscriptionRequest;
///
/// let request = SubscriptionRequest::ticks(vec!["EURUSD".to_owned(), "XAUUSD".to_owned()]);
/// let json = serde_json::to_string(&request).unwrap();
///
/// assert_eq!(json, r#"{"type":"tick","params":{"symbols":"EURUSD,XAUUSD"}}"#);
/// ```
#[skip_serializing_none]
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Builder)]
pub struct SubscriptionRequest {
    /// Message type the subscription refers to, also its identity
    #[serde(rename = "type")]
    #[builder(into)]
    pub message_type: MessageType,
    /// Type specific parameters
    #[builder(default)]
    pub params: SubscriptionParams,
    /// Set on unsubscribe messages only
    pub action: Option<SubscriptionAction>,
}

impl SubscriptionRequest {
    /// Subscribe to `message_type` without parameters.
    #[must_use]
    pub fn new<T: Into<MessageType>>(message_type: T) -> Self {
        Self {
            message_type: message_type.into(),
            params: SubscriptionParams::default(),
            action: None,
        }
    }

    /// Subscribe to price ticks for `symbols`, all symbols when empty.
    #[must_use]
    pub fn ticks(symbols: Vec<String>) -> Self {
        Self {
            message_type: MessageType::Tick,
            params: SubscriptionParams { symbols },
            action: None,
        }
    }

    /// Unsubscribe message matching this subscription.
    #[must_use]
    pub fn to_unsubscribe(&self) -> Self {
        Self {
            message_type: self.message_type.clone(),
            params: self.params.clone(),
            action: Some(SubscriptionAction::Unsubscribe),
        }
    }
}

/// Subscription action, only serialized for unsubscribe messages.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    Unsubscribe,
}

/// Parameters of a [`SubscriptionRequest`].
#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Builder)]
pub struct SubscriptionParams {
    /// Symbol filter, sent comma joined; empty means all symbols
    #[serde_as(as = "StringWithSeparator::<CommaSeparator, String>")]
    #[builder(default)]
    pub symbols: Vec<String>,
}

/// Outbound heartbeat message.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heartbeat {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// RFC 3339 time at which the heartbeat was produced
    pub time: String,
}

impl Heartbeat {
    #[must_use]
    pub fn now() -> Self {
        Self {
            message_type: MessageType::Heartbeat,
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
