#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::error::{Error, Kind};

/// Transport error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum TransportError {
    /// Unable to establish the TCP connection
    Connect {
        /// Address that was dialed
        server: String,
        /// Underlying dial failure
        source: io::Error,
    },
    /// Error reading from or writing to an established connection
    Io(io::Error),
    /// The server closed the connection
    ConnectionClosed,
    /// The operation requires an established connection
    NotConnected,
    /// `connect` was called while a connection is established
    AlreadyConnected,
    /// Operation timed out
    Timeout,
    /// A frame exceeded the configured maximum length
    FrameTooLarge {
        /// Length of the offending frame
        length: usize,
        /// Configured maximum
        max: usize,
    },
    /// The asynchronous send queue is full
    QueueFull {
        /// Capacity of the queue
        capacity: usize,
    },
    /// The reconnection policy gave up
    ReconnectsExhausted {
        /// Number of attempts made before giving up
        attempts: u32,
    },
}

impl TransportError {
    /// Whether the error only reflects the absence of a connection.
    #[must_use]
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { server, source } => {
                write!(f, "failed to connect to server {server}: {source}")
            }
            Self::Io(e) => write!(f, "connection I/O error: {e}"),
            Self::ConnectionClosed => write!(f, "connection closed by server"),
            Self::NotConnected => write!(f, "client is not connected"),
            Self::AlreadyConnected => write!(f, "client is already connected"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::FrameTooLarge { length, max } => {
                write!(f, "frame of {length} bytes exceeds maximum of {max} bytes")
            }
            Self::QueueFull { capacity } => {
                write!(f, "send queue is full (capacity {capacity})")
            }
            Self::ReconnectsExhausted { attempts } => {
                write!(f, "max reconnects exceeded after {attempts} attempts")
            }
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connect { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// Integration with main Error type
impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        let kind = match e {
            TransportError::QueueFull { .. } => Kind::Capacity,
            TransportError::ReconnectsExhausted { .. } => Kind::Policy,
            _ => Kind::Connection,
        };
        Error::with_source(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_full_maps_to_capacity_kind() {
        let error: Error = TransportError::QueueFull { capacity: 8 }.into();

        assert_eq!(error.kind(), Kind::Capacity);
        assert!(error.to_string().contains("send queue is full"));
    }

    #[test]
    fn exhausted_maps_to_policy_kind() {
        let error: Error = TransportError::ReconnectsExhausted { attempts: 2 }.into();

        assert_eq!(error.kind(), Kind::Policy);
    }

    #[test]
    fn not_connected_is_detectable_through_error() {
        let error: Error = TransportError::NotConnected.into();

        assert_eq!(error.kind(), Kind::Connection);
        assert!(error.is_not_connected());
    }
}
