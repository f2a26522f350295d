#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

use super::types::request::MessageType;
use crate::error::{Error, Kind};
use crate::transport::CodecError;

/// Error returned by user handlers.
pub type HandlerError = Box<dyn StdError + Send + Sync + 'static>;

/// Failures while routing an inbound frame. The connection stays open.
#[non_exhaustive]
#[derive(Debug)]
pub enum DispatchError {
    /// The frame is not a valid envelope
    MalformedEnvelope(CodecError),
    /// The server answered with a non-ok status
    ServerError {
        message_type: MessageType,
        status: String,
    },
    /// Neither a handler for the type nor a default handler is registered
    NoHandler(MessageType),
    /// The payload does not match the shape the handler was registered with
    PayloadDecode {
        message_type: MessageType,
        source: serde_json::Error,
    },
    /// The handler itself failed
    Handler {
        message_type: MessageType,
        source: HandlerError,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedEnvelope(e) => write!(f, "malformed envelope: {e}"),
            Self::ServerError {
                message_type,
                status,
            } => write!(f, "server error for {message_type}: {status}"),
            Self::NoHandler(message_type) => write!(f, "no handler for type: {message_type}"),
            Self::PayloadDecode {
                message_type,
                source,
            } => write!(f, "failed to decode {message_type} payload: {source}"),
            Self::Handler {
                message_type,
                source,
            } => write!(f, "handler for {message_type} failed: {source}"),
        }
    }
}

impl StdError for DispatchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::MalformedEnvelope(e) => Some(e),
            Self::PayloadDecode { source, .. } => Some(source),
            Self::Handler { source, .. } => Some(source.as_ref()),
            Self::ServerError { .. } | Self::NoHandler(_) => None,
        }
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Error::with_source(Kind::Protocol, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_handler_message_names_type() {
        let error: Error = DispatchError::NoHandler(MessageType::Deal).into();

        assert_eq!(error.kind(), Kind::Protocol);
        assert!(
            error.to_string().contains("no handler for type: deal"),
            "unexpected message: {error}"
        );
    }
}
