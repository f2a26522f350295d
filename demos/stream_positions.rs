//! Streams ticks and account positions from a trading bridge server.
//!
//! This example:
//! 1. Registers typed handlers for ticks and positions and a catch-all handler
//! 2. Subscribes before connecting, so the subscriptions go out on connect
//! 3. Logs connection state changes and alerts while it runs
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=info cargo run --example stream_positions --features tracing -- 127.0.0.1:9000
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use trading_bridge_sdk::stream::{Client, MessageType, Position, Tick};
use trading_bridge_sdk::transport::{
    Alert, AlertLevel, AlertSink, Config, FnEventHandler, ReconnectConfig,
};

const RUN_FOR: Duration = Duration::from_secs(60);

struct LogAlerts;

#[async_trait]
impl AlertSink for LogAlerts {
    async fn send_alert(&self, alert: Alert) {
        match alert.level {
            AlertLevel::Error => error!(action = %alert.action, message = %alert.message, "alert"),
            _ => warn!(action = %alert.action, message = %alert.message, "alert"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let server_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9000".to_owned());

    let config = Config::builder()
        .server_addr(server_addr.clone())
        .heartbeat_interval(Duration::from_secs(15))
        .reconnect(ReconnectConfig::builder().max_attempts(10).build())
        .build();

    let events = FnEventHandler::default()
        .with_connected(|| info!(event = "connected"))
        .with_disconnected(|| info!(event = "disconnected"))
        .with_error(|e| warn!(event = "error", error = %e));

    let client = Client::with_callbacks(config, Arc::new(events), Some(Arc::new(LogAlerts)));

    client.register_typed_handler(MessageType::Tick, |ticks: Vec<Tick>| {
        for tick in ticks {
            info!(
                stream = "tick",
                symbol = %tick.symbol,
                bid = %tick.bid,
                ask = %tick.ask,
                time = tick.time
            );
        }
        Ok(())
    });
    client.register_typed_handler(MessageType::Position, |positions: Vec<Position>| {
        for position in positions {
            info!(
                stream = "position",
                ticket = position.position,
                login = position.login,
                symbol = %position.symbol,
                volume = %position.volume,
                profit = %position.profit
            );
        }
        Ok(())
    });
    client.set_default_handler(|envelope| {
        debug!(stream = "other", message_type = %envelope.message_type, payload = %envelope.payload);
        Ok(())
    });

    client
        .subscribe_ticks(vec!["EURUSD".to_owned(), "XAUUSD".to_owned()])
        .await?;
    client.subscribe_positions().await?;

    info!(endpoint = "connect", server = %server_addr);
    client.connect().await?;
    info!(
        endpoint = "subscriptions",
        active = ?client.active_subscriptions(),
        subscribed = client.is_subscribed()
    );

    // Follow state changes until the run time elapses
    let mut states = client.state_receiver();
    let watch_states = async {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            info!(endpoint = "connection_state", state = ?state);
        }
    };
    if timeout(RUN_FOR, watch_states).await.is_ok() {
        warn!(endpoint = "connection_state", "state channel closed");
    }

    info!(
        endpoint = "disconnect",
        reconnect_attempts = client.reconnect_attempts()
    );
    client.disconnect().await?;

    Ok(())
}
