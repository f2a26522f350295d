#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests, and https://github.com/rust-lang/rust-clippy/issues/13981"
)]
#![allow(
    unused,
    reason = "Each test binary only uses part of the shared helpers"
)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt as _, StreamExt as _};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, timeout};
use tokio_util::codec::{FramedRead, FramedWrite};
use trading_bridge_sdk::error::Error;
use trading_bridge_sdk::transport::{
    Alert, AlertAction, AlertSink, Config, Encoding, EventHandler, FrameCodec, Framing,
    ReconnectConfig,
};

const MAX_FRAME: usize = 1024 * 1024;
pub const WAIT: Duration = Duration::from_secs(2);

/// Mock trading bridge server speaking the framed wire protocol.
pub struct MockServer {
    pub addr: SocketAddr,
    encoding: Encoding,
    /// Frames pushed to every connected client
    message_tx: broadcast::Sender<Bytes>,
    /// Closes every open connection
    kill_tx: broadcast::Sender<()>,
    /// Frames received from clients
    inbound_rx: mpsc::UnboundedReceiver<Value>,
    accepted: Arc<AtomicUsize>,
}

impl MockServer {
    pub async fn start() -> Self {
        Self::start_with(Framing::Lines, None).await
    }

    /// Start on a random port. `greeting` is written on every accepted connection.
    pub async fn start_with(framing: Framing, greeting: Option<Value>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (message_tx, _) = broadcast::channel::<Bytes>(100);
        let (kill_tx, _) = broadcast::channel::<()>(4);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Value>();
        let accepted = Arc::new(AtomicUsize::new(0));

        let broadcast_tx = message_tx.clone();
        let kill = kill_tx.clone();
        let counter = Arc::clone(&accepted);
        let encoding = framing.encoding();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let (read, write) = stream.into_split();
                let mut read = FramedRead::new(read, FrameCodec::new(framing, MAX_FRAME));
                let mut write = FramedWrite::new(write, FrameCodec::new(framing, MAX_FRAME));
                let mut msg_rx = broadcast_tx.subscribe();
                let mut kill_rx = kill.subscribe();
                counter.fetch_add(1, Ordering::SeqCst);
                let inbound = inbound_tx.clone();
                let greeting = greeting.clone();

                tokio::spawn(async move {
                    if let Some(greeting) = greeting {
                        let frame = encoding.encode(&greeting).unwrap();
                        if write.send(frame).await.is_err() {
                            return;
                        }
                    }

                    loop {
                        tokio::select! {
                            frame = read.next() => match frame {
                                Some(Ok(frame)) => {
                                    if let Ok(value) = encoding.decode::<Value>(&frame) {
                                        drop(inbound.send(value));
                                    }
                                }
                                _ => break,
                            },
                            frame = msg_rx.recv() => match frame {
                                Ok(frame) => {
                                    if write.send(frame).await.is_err() {
                                        break;
                                    }
                                }
                                Err(_) => break,
                            },
                            _ = kill_rx.recv() => break,
                        }
                    }
                });
            }
        });

        Self {
            addr,
            encoding,
            message_tx,
            kill_tx,
            inbound_rx,
            accepted,
        }
    }

    /// Push a message to every connected client.
    pub fn send(&self, message: &Value) {
        let frame = self.encoding.encode(message).unwrap();
        drop(self.message_tx.send(frame));
    }

    /// Close every open connection from the server side.
    pub fn disconnect_all(&self) {
        drop(self.kill_tx.send(()));
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Wait until `count` connections were accepted and can receive pushes.
    pub async fn wait_for_accepted(&self, count: usize) {
        timeout(WAIT, async {
            while self.accepted() < count {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    /// Next frame received from a client, heartbeats included.
    pub async fn recv(&mut self) -> Option<Value> {
        timeout(WAIT, self.inbound_rx.recv()).await.ok().flatten()
    }

    /// Next non-heartbeat frame received from a client.
    pub async fn recv_request(&mut self) -> Option<Value> {
        loop {
            let value = self.recv().await?;
            if value["type"] != "heartbeat" {
                return Some(value);
            }
        }
    }

    /// Whether a non-heartbeat frame arrives within `within`.
    pub async fn has_request_within(&mut self, within: Duration) -> bool {
        timeout(within, async {
            loop {
                match self.inbound_rx.recv().await {
                    Some(value) if value["type"] != "heartbeat" => return true,
                    Some(_) => {}
                    None => return false,
                }
            }
        })
        .await
        .unwrap_or(false)
    }
}

/// Config tuned for fast tests.
pub fn config(addr: SocketAddr) -> Config {
    Config::builder()
        .server_addr(addr.to_string())
        .dial_timeout(Duration::from_secs(1))
        .heartbeat_interval(Duration::ZERO)
        .resubscribe_interval(Duration::from_millis(50))
        .reconnect(
            ReconnectConfig::builder()
                .initial_backoff(Duration::from_millis(20))
                .max_backoff(Duration::from_millis(100))
                .build(),
        )
        .build()
}

/// Event handler and alert sink recording everything it is told.
#[derive(Default)]
pub struct Recorder {
    pub connected: AtomicUsize,
    pub disconnected: AtomicUsize,
    pub errors: Mutex<Vec<String>>,
    pub alerts: Mutex<Vec<Alert>>,
}

impl Recorder {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn alerts_for(&self, action: AlertAction) -> usize {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|alert| alert.action == action)
            .count()
    }

    /// Wait until `check` holds, failing the test after [`WAIT`].
    pub async fn wait_until<F: Fn(&Self) -> bool>(&self, check: F) {
        timeout(WAIT, async {
            while !check(self) {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }
}

impl EventHandler for Recorder {
    fn on_connected(&self) {
        self.connected.fetch_add(1, Ordering::SeqCst);
    }

    fn on_disconnected(&self) {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error(&self, error: &Error) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

#[async_trait]
impl AlertSink for Recorder {
    async fn send_alert(&self, alert: Alert) {
        self.alerts.lock().unwrap().push(alert);
    }
}
