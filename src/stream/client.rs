use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use super::error::HandlerError;
use super::registry::HandlerRegistry;
use super::types::request::{MessageType, SubscriptionRequest};
use super::types::response::Envelope;
use crate::Result;
use crate::error::Error;
use crate::transport::{
    ActiveSubscription, AlertSink, Config, ConnectionManager, ConnectionState, EventHandler,
    FnEventHandler,
};

/// Streaming client for market data and trading events.
///
/// Handlers registered on the client receive the decoded envelopes of every
/// connection; active subscriptions are replayed after each reconnection.
///
/// # Example
///
/// ```rust, no_run
/// use trading_bridge_sdk::stream::{Client, MessageType, Tick};
/// use trading_bridge_sdk::transport::Config;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = Client::new(Config::builder().server_addr("127.0.0.1:9000").build());
///
///     client.register_typed_handler(MessageType::Tick, |ticks: Vec<Tick>| {
///         for tick in ticks {
///             println!("{}: {}", tick.symbol, tick.bid);
///         }
///         Ok(())
///     });
///
///     client.subscribe_ticks(vec!["EURUSD".to_owned()]).await?;
///     client.connect().await?;
///
///     tokio::time::sleep(std::time::Duration::from_secs(60)).await;
///     client.disconnect().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    connection: ConnectionManager<HandlerRegistry>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Client {
    /// Create a disconnected client without lifecycle callbacks.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_callbacks(config, Arc::new(FnEventHandler::default()), None)
    }

    /// Create a disconnected client reporting to `events` and, if given, `alerts`.
    ///
    /// Must be called within a Tokio runtime when an alert sink is given.
    #[must_use]
    pub fn with_callbacks(
        config: Config,
        events: Arc<dyn EventHandler>,
        alerts: Option<Arc<dyn AlertSink>>,
    ) -> Self {
        let registry = Arc::new(HandlerRegistry::new());
        Self {
            connection: ConnectionManager::new(config, registry, events, alerts),
        }
    }

    /// Dial the server and start streaming.
    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await
    }

    /// Stop streaming and close the connection. Safe to call repeatedly.
    pub async fn disconnect(&self) -> Result<()> {
        self.connection.disconnect().await
    }

    /// Write `message` to the server and wait for the flush.
    pub async fn send<R: Serialize + ?Sized>(&self, message: &R) -> Result<()> {
        self.connection.send(message).await
    }

    /// Queue `message` for the write loop; fails at once when the queue is full.
    pub fn send_async<R: Serialize + ?Sized>(&self, message: &R) -> Result<()> {
        self.connection.send_async(message)
    }

    /// Keep `request` active and send it when connected.
    ///
    /// A new message type is appended to the active set. A request for a type
    /// that is already active replaces that entry in place, so it keeps its
    /// original position when the set is replayed after a reconnection.
    pub async fn subscribe(&self, request: SubscriptionRequest) -> Result<()> {
        validate(&request)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(message_type = %request.message_type, "Subscribing");

        self.connection
            .subscribe(request.message_type.as_str(), &request)
            .await
    }

    /// Drop the active subscription of `message_type` and tell the server.
    pub async fn unsubscribe(&self, message_type: &MessageType) -> Result<()> {
        let message = SubscriptionRequest::new(message_type.clone()).to_unsubscribe();
        self.connection
            .unsubscribe(message_type.as_str(), &message)
            .await
    }

    /// Subscribe to price ticks of `symbols`, every symbol when empty.
    pub async fn subscribe_ticks(&self, symbols: Vec<String>) -> Result<()> {
        self.subscribe(SubscriptionRequest::ticks(symbols)).await
    }

    pub async fn subscribe_positions(&self) -> Result<()> {
        self.subscribe(SubscriptionRequest::new(MessageType::Position))
            .await
    }

    pub async fn subscribe_orders(&self) -> Result<()> {
        self.subscribe(SubscriptionRequest::new(MessageType::Order)).await
    }

    pub async fn subscribe_deals(&self) -> Result<()> {
        self.subscribe(SubscriptionRequest::new(MessageType::Deal)).await
    }

    pub async fn subscribe_margin_calls(&self) -> Result<()> {
        self.subscribe(SubscriptionRequest::new(MessageType::MarginCall))
            .await
    }

    pub async fn subscribe_stop_outs(&self) -> Result<()> {
        self.subscribe(SubscriptionRequest::new(MessageType::StopOut))
            .await
    }

    pub async fn subscribe_user_adds(&self) -> Result<()> {
        self.subscribe(SubscriptionRequest::new(MessageType::UserAdd))
            .await
    }

    /// Replace every active subscription without sending anything now.
    ///
    /// The set is delivered on the next monitor tick or (re)connection.
    pub fn set_subscriptions(&self, requests: Vec<SubscriptionRequest>) -> Result<()> {
        let encoding = self.config().framing.encoding();
        let subscriptions = requests
            .iter()
            .map(|request| {
                validate(request)?;
                Ok(ActiveSubscription {
                    key: request.message_type.as_str().to_owned(),
                    frame: encoding.encode(request)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.connection.set_subscriptions(subscriptions);
        Ok(())
    }

    /// See [`HandlerRegistry::register_handler`].
    pub fn register_handler<F>(&self, message_type: MessageType, handler: F)
    where
        F: Fn(&Envelope) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.registry().register_handler(message_type, handler);
    }

    /// See [`HandlerRegistry::register_typed_handler`].
    pub fn register_typed_handler<T, F>(&self, message_type: MessageType, handler: F)
    where
        T: DeserializeOwned,
        F: Fn(T) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.registry()
            .register_typed_handler(message_type, handler);
    }

    /// See [`HandlerRegistry::set_default_handler`].
    pub fn set_default_handler<F>(&self, handler: F)
    where
        F: Fn(&Envelope) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.registry().set_default_handler(handler);
    }

    pub fn unregister_handler(&self, message_type: &MessageType) -> bool {
        self.registry().unregister(message_type)
    }

    #[must_use]
    pub fn registered_types(&self) -> Vec<MessageType> {
        self.registry().registered_types()
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        self.connection.dispatcher()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.connection.state_receiver()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Whether every active subscription was delivered on the current connection.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.connection.is_subscribed()
    }

    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.connection.reconnect_attempts()
    }

    /// Message types of the active subscriptions in the order they were added.
    #[must_use]
    pub fn active_subscriptions(&self) -> Vec<MessageType> {
        self.connection
            .active_subscriptions()
            .iter()
            .map(|key| MessageType::from(key.as_str()))
            .collect()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        self.connection.config()
    }
}

/// Symbols are sent comma joined, so they must be non-empty and free of
/// separators.
fn validate(request: &SubscriptionRequest) -> Result<()> {
    if let Some(symbol) = request
        .params
        .symbols
        .iter()
        .find(|s| s.is_empty() || s.contains(',') || s.contains(char::is_whitespace))
    {
        return Err(Error::validation(format!(
            "invalid symbol {symbol:?} in {} subscription",
            request.message_type
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Kind;

    #[tokio::test]
    async fn subscribe_rejects_symbols_with_separators() {
        let client = Client::default();

        let err = client
            .subscribe_ticks(vec!["EURUSD,GBPUSD".to_owned()])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), Kind::Validation);
        assert!(client.active_subscriptions().is_empty(), "nothing recorded");
    }

    #[tokio::test]
    async fn subscriptions_are_kept_while_disconnected() {
        let client = Client::default();

        client
            .subscribe_ticks(vec!["EURUSD".to_owned()])
            .await
            .unwrap();
        client.subscribe_positions().await.unwrap();
        client
            .subscribe_ticks(vec!["XAUUSD".to_owned()])
            .await
            .unwrap();

        assert_eq!(
            client.active_subscriptions(),
            vec![MessageType::Tick, MessageType::Position]
        );

        client.unsubscribe(&MessageType::Tick).await.unwrap();
        assert_eq!(client.active_subscriptions(), vec![MessageType::Position]);
    }

    #[tokio::test]
    async fn set_subscriptions_replaces_the_set() {
        let client = Client::default();
        client.subscribe_deals().await.unwrap();

        client
            .set_subscriptions(vec![
                SubscriptionRequest::new(MessageType::Order),
                SubscriptionRequest::new(MessageType::StopOut),
            ])
            .unwrap();

        assert_eq!(
            client.active_subscriptions(),
            vec![MessageType::Order, MessageType::StopOut]
        );
        assert!(!client.is_subscribed(), "new set is pending");
    }

    #[tokio::test]
    async fn handlers_are_registered_on_the_shared_registry() {
        let client = Client::default();
        let other = client.clone();

        client.register_handler(MessageType::Deal, |_| Ok(()));

        assert_eq!(other.registered_types(), vec![MessageType::Deal]);
        assert!(other.unregister_handler(&MessageType::Deal), "was registered");
    }
}
