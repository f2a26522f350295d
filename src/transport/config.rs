#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use backoff::backoff::Backoff;
use bon::Builder;

use super::frame::Framing;

const DEFAULT_SERVER_ADDR: &str = "localhost:8080";
const DEFAULT_DIAL_TIMEOUT_DURATION: Duration = Duration::from_secs(10);
const DEFAULT_WRITE_TIMEOUT_DURATION: Duration = Duration::from_secs(10);
const DEFAULT_HEARTBEAT_INTERVAL_DURATION: Duration = Duration::from_secs(30);
const DEFAULT_RESUBSCRIBE_INTERVAL_DURATION: Duration = Duration::from_secs(1);
const DEFAULT_BUFFER_SIZE: usize = 4096;
const DEFAULT_SEND_QUEUE_CAPACITY: usize = 1000;
const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_INITIAL_BACKOFF_DURATION: Duration = Duration::from_secs(1);
const DEFAULT_MAX_BACKOFF_DURATION: Duration = Duration::from_secs(5);

/// Configuration for a streaming TCP connection.
///
/// Immutable once handed to a client; every loop of a connection reads its
/// parameters from here.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Server address in `host:port` form
    #[builder(into, default = DEFAULT_SERVER_ADDR.to_owned())]
    pub server_addr: String,
    /// Upper bound for establishing the TCP connection
    #[builder(default = DEFAULT_DIAL_TIMEOUT_DURATION)]
    pub dial_timeout: Duration,
    /// Interval between outbound heartbeats. [`Duration::ZERO`] disables heartbeats.
    #[builder(default = DEFAULT_HEARTBEAT_INTERVAL_DURATION)]
    pub heartbeat_interval: Duration,
    /// Maximum time a single read may wait before it is retried.
    /// A timed out read does not mark the connection as lost.
    pub read_timeout: Option<Duration>,
    /// Maximum time a single write-and-flush may take
    #[builder(default = DEFAULT_WRITE_TIMEOUT_DURATION)]
    pub write_timeout: Duration,
    /// Capacity of the buffered reader
    #[builder(default = DEFAULT_BUFFER_SIZE)]
    pub read_buffer_size: usize,
    /// Number of buffered bytes after which the writer applies backpressure
    #[builder(default = DEFAULT_BUFFER_SIZE)]
    pub write_buffer_size: usize,
    /// Capacity of the bounded asynchronous send queue
    #[builder(default = DEFAULT_SEND_QUEUE_CAPACITY)]
    pub send_queue_capacity: usize,
    /// Tick of the monitor loop that re-sends pending subscriptions
    #[builder(default = DEFAULT_RESUBSCRIBE_INTERVAL_DURATION)]
    pub resubscribe_interval: Duration,
    /// Framing applied to both directions of the connection
    #[builder(default)]
    pub framing: Framing,
    /// Largest frame accepted from or sent to the server
    #[builder(default = DEFAULT_MAX_FRAME_LENGTH)]
    pub max_frame_length: usize,
    /// Reconnection strategy configuration
    #[builder(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Configuration for automatic reconnection behavior.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct ReconnectConfig {
    /// Whether a lost connection is re-established automatically
    #[builder(default = true)]
    pub enabled: bool,
    /// Maximum number of reconnection attempts before giving up.
    /// Zero means infinite retries.
    #[builder(default = DEFAULT_MAX_RECONNECT_ATTEMPTS)]
    pub max_attempts: u32,
    /// Backoff applied after the first failed reconnection attempt
    #[builder(default = DEFAULT_INITIAL_BACKOFF_DURATION)]
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    #[builder(default = DEFAULT_MAX_BACKOFF_DURATION)]
    pub max_backoff: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ReconnectConfig {
    /// The attempt limit, `None` when retries are unlimited.
    #[must_use]
    pub fn attempt_limit(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }

    /// Backoff for the given 1-based attempt: `min(initial * 2^(attempt - 1), max)`.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .checked_mul(1_u32 << exponent)
            .map_or(self.max_backoff, |backoff| backoff.min(self.max_backoff))
    }
}

impl From<&ReconnectConfig> for ReconnectBackoff {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            config: config.clone(),
            attempt: 0,
        }
    }
}

/// Deterministic exponential backoff without jitter.
///
/// Each call to [`Backoff::next_backoff`] advances the attempt counter; the
/// sequence never ends, the attempt limit is enforced by the caller.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    config: ReconnectConfig,
    attempt: u32,
}

impl ReconnectBackoff {
    /// Number of backoffs handed out since the last reset.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Backoff for ReconnectBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt = self.attempt.saturating_add(1);
        Some(self.config.backoff_for(self.attempt))
    }
}
