#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use backoff::backoff::Backoff as _;
use bytes::Bytes;
use futures::{SinkExt as _, StreamExt as _};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, interval_at, sleep, timeout};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::alert::{AlertAction, AlertLevel, Notifier};
use super::codec::CodecError;
use super::config::{Config, ReconnectBackoff};
use super::error::TransportError;
use super::frame::FrameCodec;
use super::subscription::{ActiveSubscription, SubscriptionSet};
use super::traits::{AlertSink, Dispatcher, EventHandler};
use crate::Result;
use crate::error::Error;

/// Lower bound for the monitor tick; `interval` rejects a zero period.
const MIN_MONITOR_TICK: Duration = Duration::from_millis(10);

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected, automatic reconnection is not running
    Disconnected,
    /// Dialing the server for an explicit `connect`
    Connecting,
    /// Successfully connected
    Connected {
        /// When the connection was established
        since: Instant,
    },
    /// Reconnecting after failure
    Reconnecting {
        /// Current reconnection attempt number
        attempt: u32,
    },
    /// Closed on request by `disconnect`
    Closed,
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Writing half of an established connection.
struct Link {
    writer: FramedWrite<OwnedWriteHalf, FrameCodec>,
    peer: Option<SocketAddr>,
}

/// Tasks bound to one established socket.
struct Generation {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Everything started by one successful (or retrying) `connect` call.
struct Session {
    token: CancellationToken,
    monitor: JoinHandle<()>,
}

struct Shared<D: Dispatcher> {
    config: Config,
    dispatcher: Arc<D>,
    events: Arc<dyn EventHandler>,
    notifier: Notifier,
    /// Socket writer, replaced as a unit on every (re)connect
    link: tokio::sync::Mutex<Option<Link>>,
    /// Sender side of the bounded asynchronous send queue
    queue: Mutex<Option<mpsc::Sender<Bytes>>>,
    /// Pending reconnect signal (capacity 1)
    signal: Mutex<Option<mpsc::Sender<()>>>,
    generation: Mutex<Option<Generation>>,
    /// Serializes `connect` and `disconnect`
    session: tokio::sync::Mutex<Option<Session>>,
    subscriptions: SubscriptionSet,
    connected: AtomicBool,
    subscribed: AtomicBool,
    attempts: AtomicU32,
    state_tx: watch::Sender<ConnectionState>,
    /// Parent of every session token, cancelled when the last handle is dropped
    root: CancellationToken,
}

/// Manages a streaming TCP connection: lifecycle, reconnection, heartbeat,
/// resubscription and the bounded asynchronous send queue.
///
/// Inbound frames are handed to the [`Dispatcher`] `D` in arrival order.
/// While connected, four tasks cooperate:
/// - read loop: decodes frames and dispatches them
/// - write loop: drains the asynchronous send queue
/// - heartbeat loop: sends the dispatcher's heartbeat message on every tick
/// - monitor loop: handles reconnect signals and re-sends pending subscriptions
///
/// The first three belong to a single socket and are replaced on every
/// reconnection; the monitor lives from `connect` until `disconnect` or until
/// the reconnection policy gives up.
///
/// # Example
///
/// ```ignore
/// let connection = ConnectionManager::new(config, Arc::new(registry), events, None);
///
/// connection.connect().await?;
/// connection.subscribe("tick", &request).await?;
/// connection.send_async(&message)?;
/// connection.disconnect().await?;
/// ```
pub struct ConnectionManager<D: Dispatcher> {
    inner: Arc<Shared<D>>,
    guard: Arc<DropGuard>,
}

impl<D: Dispatcher> Clone for ConnectionManager<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            guard: Arc::clone(&self.guard),
        }
    }
}

impl<D: Dispatcher> ConnectionManager<D> {
    /// Create a disconnected connection manager.
    ///
    /// Must be called within a Tokio runtime when an alert sink is given.
    pub fn new(
        config: Config,
        dispatcher: Arc<D>,
        events: Arc<dyn EventHandler>,
        alerts: Option<Arc<dyn AlertSink>>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let root = CancellationToken::new();
        let guard = root.clone().drop_guard();

        let inner = Shared {
            config,
            dispatcher,
            events,
            notifier: alerts.map(Notifier::spawn).unwrap_or_default(),
            link: tokio::sync::Mutex::new(None),
            queue: Mutex::new(None),
            signal: Mutex::new(None),
            generation: Mutex::new(None),
            session: tokio::sync::Mutex::new(None),
            subscriptions: SubscriptionSet::new(),
            connected: AtomicBool::new(false),
            subscribed: AtomicBool::new(false),
            attempts: AtomicU32::new(0),
            state_tx,
            root,
        };

        Self {
            inner: Arc::new(inner),
            guard: Arc::new(guard),
        }
    }

    /// Dial the server and start the connection loops.
    ///
    /// Fails with [`TransportError::AlreadyConnected`] while connected. When the
    /// dial fails and reconnection is enabled, the error is returned and
    /// automatic reconnection starts in the background.
    pub async fn connect(&self) -> Result<()> {
        let inner = &self.inner;
        let mut session = inner.session.lock().await;

        if inner.connected.load(Ordering::SeqCst) {
            return Err(TransportError::AlreadyConnected.into());
        }

        // A previous session may still be retrying or may have given up
        if let Some(stale) = session.take() {
            stale.stop().await;
        }
        inner.teardown().await;
        inner.connected.store(false, Ordering::SeqCst);

        inner.set_state(ConnectionState::Connecting);
        let token = inner.root.child_token();
        let (signal_tx, signal_rx) = mpsc::channel(1);

        match inner.dial().await {
            Ok(stream) => {
                *lock(&inner.signal) = Some(signal_tx);
                inner.establish(stream, &token).await;
                *session = Some(Arc::clone(inner).start_session(token, signal_rx));
                inner.notifier.notify(
                    AlertLevel::Warning,
                    AlertAction::Connect,
                    format!("connected to {}", inner.config.server_addr),
                );
                Ok(())
            }
            Err(e) => {
                let error = Error::from(e);
                #[cfg(feature = "tracing")]
                tracing::warn!(server = %inner.config.server_addr, error = %error, "Unable to connect");
                inner.events.on_error(&error);
                inner.notifier.notify(
                    AlertLevel::Error,
                    AlertAction::Connect,
                    format!("failed to connect: {error}"),
                );

                inner.set_state(ConnectionState::Disconnected);
                if inner.config.reconnect.enabled {
                    _ = signal_tx.try_send(());
                    *lock(&inner.signal) = Some(signal_tx);
                    *session = Some(Arc::clone(inner).start_session(token, signal_rx));
                }

                Err(error)
            }
        }
    }

    /// Stop all loops, close the send queue and the socket.
    ///
    /// Idempotent: calling it while disconnected is a no-op that succeeds.
    pub async fn disconnect(&self) -> Result<()> {
        let inner = &self.inner;
        let mut session = inner.session.lock().await;

        let stopped = match session.take() {
            Some(session) => {
                session.stop().await;
                true
            }
            None => false,
        };
        lock(&inner.signal).take();

        let torn_down = inner.teardown().await;
        let was_connected = inner.connected.swap(false, Ordering::SeqCst);
        inner.subscribed.store(false, Ordering::SeqCst);
        inner.attempts.store(0, Ordering::SeqCst);
        inner.set_state(ConnectionState::Closed);

        if stopped || torn_down || was_connected {
            #[cfg(feature = "tracing")]
            tracing::debug!(server = %inner.config.server_addr, "Disconnected");
            inner.events.on_disconnected();
            inner.notifier.notify(
                AlertLevel::Warning,
                AlertAction::Disconnect,
                format!("disconnected from {}", inner.config.server_addr),
            );
        }

        Ok(())
    }

    /// Serialize `message` and write it to the socket, waiting for the flush.
    pub async fn send<R: Serialize + ?Sized>(&self, message: &R) -> Result<()> {
        let frame = self.inner.encode(message)?;
        self.inner.write_frame(frame).await?;
        Ok(())
    }

    /// Serialize `message` and enqueue it for the write loop.
    ///
    /// Never waits: a full queue is reported as [`TransportError::QueueFull`].
    pub fn send_async<R: Serialize + ?Sized>(&self, message: &R) -> Result<()> {
        let frame = self.inner.encode(message)?;
        let queue = lock(&self.inner.queue);
        let tx = queue.as_ref().ok_or(TransportError::NotConnected)?;

        tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::QueueFull {
                capacity: tx.max_capacity(),
            },
            TrySendError::Closed(_) => TransportError::NotConnected,
        })?;

        Ok(())
    }

    /// Record `request` as the active subscription for `key` and send it.
    ///
    /// While disconnected the request is only recorded; it is delivered by the
    /// next (re)connection.
    pub async fn subscribe<R: Serialize + ?Sized>(&self, key: &str, request: &R) -> Result<()> {
        let frame = self.inner.encode(request)?;
        self.inner.subscriptions.insert(key, frame.clone());

        if !self.is_connected() {
            return Ok(());
        }

        match self.inner.write_frame(frame).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_connected() => Ok(()),
            Err(e) => {
                self.inner.subscribed.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Forget the active subscription for `key` and send `message` to the server.
    pub async fn unsubscribe<R: Serialize + ?Sized>(&self, key: &str, message: &R) -> Result<()> {
        let frame = self.inner.encode(message)?;
        self.inner.subscriptions.remove(key);

        if !self.is_connected() {
            return Ok(());
        }

        match self.inner.write_frame(frame).await {
            Err(e) if !e.is_not_connected() => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Replace the active subscription set without sending anything.
    ///
    /// The new set is delivered by the next monitor tick or reconnection.
    pub fn set_subscriptions(&self, subscriptions: Vec<ActiveSubscription>) {
        self.inner.subscriptions.replace(subscriptions);
        self.inner.subscribed.store(false, Ordering::SeqCst);
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Whether every active subscription was delivered on the current connection.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.inner.subscribed.load(Ordering::SeqCst)
    }

    /// Reconnection attempts made since the last successful connection.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Keys of the active subscriptions in insertion order.
    #[must_use]
    pub fn active_subscriptions(&self) -> Vec<String> {
        self.inner.subscriptions.keys()
    }

    /// Address of the connected server, if any.
    pub async fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.link.lock().await.as_ref().and_then(|link| link.peer)
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<D> {
        &self.inner.dispatcher
    }
}

impl Session {
    async fn stop(self) {
        self.token.cancel();
        _ = self.monitor.await;
    }
}

impl<D: Dispatcher> Shared<D> {
    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    fn encode<R: Serialize + ?Sized>(
        &self,
        message: &R,
    ) -> std::result::Result<Bytes, CodecError> {
        self.config.framing.encoding().encode(message)
    }

    async fn dial(&self) -> std::result::Result<TcpStream, TransportError> {
        let server = &self.config.server_addr;

        let stream = match timeout(self.config.dial_timeout, TcpStream::connect(server.as_str()))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(TransportError::Connect {
                    server: server.clone(),
                    source,
                });
            }
            Err(_elapsed) => {
                return Err(TransportError::Connect {
                    server: server.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("dial timed out after {:?}", self.config.dial_timeout),
                    ),
                });
            }
        };

        _ = stream.set_nodelay(true);
        Ok(stream)
    }

    /// Install a freshly dialed socket and start its loops.
    ///
    /// Active subscriptions are written before the read loop starts, so they
    /// precede every frame dispatched on this connection.
    async fn establish(self: &Arc<Self>, stream: TcpStream, session: &CancellationToken) {
        let peer = stream.peer_addr().ok();
        let (read_half, write_half) = stream.into_split();
        let codec = FrameCodec::new(self.config.framing, self.config.max_frame_length);

        let reader = FramedRead::with_capacity(read_half, codec.clone(), self.config.read_buffer_size);
        let mut writer = FramedWrite::new(write_half, codec);
        writer.set_backpressure_boundary(self.config.write_buffer_size);

        *self.link.lock().await = Some(Link { writer, peer });

        let (queue_tx, queue_rx) = mpsc::channel(self.config.send_queue_capacity.max(1));
        *lock(&self.queue) = Some(queue_tx);

        self.connected.store(true, Ordering::SeqCst);
        self.subscribed.store(false, Ordering::SeqCst);
        self.attempts.store(0, Ordering::SeqCst);
        self.set_state(ConnectionState::Connected {
            since: Instant::now(),
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(server = %self.config.server_addr, ?peer, "Connected");

        self.resubscribe().await;

        let token = session.child_token();
        let tasks = vec![
            tokio::spawn(Arc::clone(self).read_loop(token.clone(), reader)),
            tokio::spawn(Arc::clone(self).write_loop(token.clone(), queue_rx)),
            tokio::spawn(Arc::clone(self).heartbeat_loop(token.clone())),
        ];
        *lock(&self.generation) = Some(Generation { token, tasks });

        self.events.on_connected();
    }

    fn start_session(
        self: Arc<Self>,
        token: CancellationToken,
        signal_rx: mpsc::Receiver<()>,
    ) -> Session {
        let monitor = tokio::spawn(Arc::clone(&self).monitor_loop(token.clone(), signal_rx));
        Session { token, monitor }
    }

    /// Cancel and join the loops of the current socket, then drop the socket.
    ///
    /// Returns whether anything was running.
    async fn teardown(&self) -> bool {
        let generation = lock(&self.generation).take();
        let running = generation.is_some();

        if let Some(generation) = generation {
            generation.token.cancel();
            lock(&self.queue).take();
            for task in generation.tasks {
                _ = task.await;
            }
        } else {
            lock(&self.queue).take();
        }

        let link = self.link.lock().await.take();
        running || link.is_some()
    }

    async fn write_frame(&self, frame: Bytes) -> std::result::Result<(), TransportError> {
        let mut link = self.link.lock().await;
        let link = link.as_mut().ok_or(TransportError::NotConnected)?;

        timeout(self.config.write_timeout, link.writer.send(frame))
            .await
            .map_err(|_elapsed| TransportError::Timeout)?
    }

    /// Arm the reconnect signal. A signal that is already pending absorbs this one.
    fn signal_reconnect(&self) -> bool {
        lock(&self.signal)
            .as_ref()
            .is_some_and(|tx| !matches!(tx.try_send(()), Err(TrySendError::Closed(()))))
    }

    /// Handle the loss of the socket owned by `generation`.
    ///
    /// Only the first caller per socket reports the error; losses observed
    /// during shutdown are ignored.
    fn connection_lost(&self, generation: &CancellationToken, error: Error) {
        if generation.is_cancelled() || !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }

        self.subscribed.store(false, Ordering::SeqCst);
        generation.cancel();

        #[cfg(feature = "tracing")]
        tracing::warn!(server = %self.config.server_addr, error = %error, "Connection lost");
        self.events.on_error(&error);
        self.notifier.notify(
            AlertLevel::Error,
            AlertAction::Close,
            format!("connection lost: {error}"),
        );

        self.set_state(ConnectionState::Disconnected);
        if self.config.reconnect.enabled {
            self.signal_reconnect();
        }
    }

    /// Write every active subscription in insertion order; mark the connection
    /// subscribed when all of them went out.
    async fn resubscribe(&self) {
        if self.subscribed.load(Ordering::SeqCst) || !self.connected.load(Ordering::SeqCst) {
            return;
        }

        let mut delivered = true;
        for subscription in self.subscriptions.snapshot() {
            match self.write_frame(subscription.frame).await {
                Ok(()) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(message_type = %subscription.key, "Subscription sent");
                }
                Err(e) if e.is_not_connected() => return,
                Err(e) => {
                    delivered = false;
                    #[cfg(feature = "tracing")]
                    tracing::warn!(message_type = %subscription.key, error = %e, "Unable to send subscription");
                    self.events.on_error(&e.into());
                }
            }
        }

        if delivered {
            self.subscribed.store(true, Ordering::SeqCst);
        }
    }

    async fn read_loop(
        self: Arc<Self>,
        token: CancellationToken,
        mut reader: FramedRead<OwnedReadHalf, FrameCodec>,
    ) {
        let encoding = self.config.framing.encoding();

        loop {
            let next = tokio::select! {
                biased;

                () = token.cancelled() => break,
                next = Self::read_frame(self.config.read_timeout, &mut reader) => next,
            };

            match next {
                // Read timed out, the connection is still considered alive
                None => {}
                Some(None) => {
                    self.connection_lost(&token, TransportError::ConnectionClosed.into());
                    break;
                }
                Some(Some(Err(e))) => {
                    self.connection_lost(&token, e.into());
                    break;
                }
                Some(Some(Ok(frame))) => {
                    if frame.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }

                    #[cfg(feature = "tracing")]
                    tracing::trace!(len = frame.len(), "Received frame");

                    if let Err(e) = self.dispatcher.dispatch(&frame, encoding) {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(error = %e, "Failed to dispatch frame");
                        self.events.on_error(&e);
                    }
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("Read loop stopped");
    }

    /// `None` when the read timed out.
    async fn read_frame(
        read_timeout: Option<Duration>,
        reader: &mut FramedRead<OwnedReadHalf, FrameCodec>,
    ) -> Option<Option<std::result::Result<Bytes, TransportError>>> {
        match read_timeout {
            Some(limit) => timeout(limit, reader.next()).await.ok(),
            None => Some(reader.next().await),
        }
    }

    async fn write_loop(self: Arc<Self>, token: CancellationToken, mut rx: mpsc::Receiver<Bytes>) {
        loop {
            let frame = tokio::select! {
                biased;

                () = token.cancelled() => break,
                frame = rx.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            let written = tokio::select! {
                () = token.cancelled() => break,
                written = self.write_frame(frame) => written,
            };

            if let Err(e) = written {
                if !e.is_not_connected() {
                    self.connection_lost(&token, e.into());
                }
                break;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("Write loop stopped");
    }

    async fn heartbeat_loop(self: Arc<Self>, token: CancellationToken) {
        let period = self.config.heartbeat_interval;
        if period.is_zero() {
            return;
        }
        let encoding = self.config.framing.encoding();

        let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(beat) = self.dispatcher.heartbeat(encoding) else {
                continue;
            };

            let written = tokio::select! {
                () = token.cancelled() => break,
                written = self.write_frame(beat) => written,
            };

            if let Err(e) = written {
                if !e.is_not_connected() {
                    self.connection_lost(&token, e.into());
                }
                break;
            }
        }
    }

    async fn monitor_loop(self: Arc<Self>, token: CancellationToken, mut signal_rx: mpsc::Receiver<()>) {
        let mut backoff = ReconnectBackoff::from(&self.config.reconnect);
        let mut ticker = interval(self.config.resubscribe_interval.max(MIN_MONITOR_TICK));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                () = token.cancelled() => break,
                Some(()) = signal_rx.recv() => {
                    if self.reconnect(&token, &mut backoff).await.is_break() {
                        break;
                    }
                }
                _ = ticker.tick() => self.resubscribe().await,
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("Monitor loop stopped");
    }

    /// Run one reconnection attempt.
    async fn reconnect(
        self: &Arc<Self>,
        session: &CancellationToken,
        backoff: &mut ReconnectBackoff,
    ) -> ControlFlow<()> {
        if self.connected.load(Ordering::SeqCst) {
            return ControlFlow::Continue(());
        }

        self.subscribed.store(false, Ordering::SeqCst);
        self.teardown().await;

        let attempt = self.attempts.load(Ordering::SeqCst).saturating_add(1);
        if let Some(max) = self.config.reconnect.attempt_limit()
            && attempt > max
        {
            self.attempts.store(0, Ordering::SeqCst);
            backoff.reset();
            self.set_state(ConnectionState::Disconnected);

            let error = Error::from(TransportError::ReconnectsExhausted { attempts: max });
            #[cfg(feature = "tracing")]
            tracing::error!(server = %self.config.server_addr, attempts = max, "Giving up reconnecting");
            self.events.on_error(&error);
            self.notifier.notify(
                AlertLevel::Error,
                AlertAction::Exhausted,
                format!("giving up after {max} reconnection attempts"),
            );

            return ControlFlow::Break(());
        }

        self.attempts.store(attempt, Ordering::SeqCst);
        self.set_state(ConnectionState::Reconnecting { attempt });
        let delay = backoff
            .next_backoff()
            .unwrap_or(self.config.reconnect.max_backoff);

        #[cfg(feature = "tracing")]
        tracing::debug!(server = %self.config.server_addr, attempt, ?delay, "Reconnecting");

        let dialed = tokio::select! {
            () = session.cancelled() => return ControlFlow::Break(()),
            dialed = self.dial() => dialed,
        };

        match dialed {
            Ok(stream) => {
                self.establish(stream, session).await;
                backoff.reset();
                self.notifier.notify(
                    AlertLevel::Warning,
                    AlertAction::Disconnect,
                    format!("reconnected to {} after {attempt} attempt(s)", self.config.server_addr),
                );
            }
            Err(e) => {
                let error = Error::from(e);
                #[cfg(feature = "tracing")]
                tracing::warn!(attempt, error = %error, "Reconnection attempt failed");
                self.events.on_error(&error);
                self.notifier.notify(
                    AlertLevel::Error,
                    AlertAction::Disconnect,
                    format!("reconnection attempt {attempt} failed: {error}"),
                );

                tokio::select! {
                    () = session.cancelled() => return ControlFlow::Break(()),
                    () = sleep(delay) => {}
                }
                self.signal_reconnect();
            }
        }

        ControlFlow::Continue(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
