//! Wire codecs.
//!
//! Converts messages to and from the payload bytes carried inside a frame
//! (see [`super::frame`]). The encoding is fixed by the connection's framing
//! so a connection speaks exactly one scheme in both directions:
//!
//! - [`Encoding::Json`]: compact JSON. An encoded message never contains a raw
//!   newline and is safe for [`super::frame::Framing::Lines`].
//! - [`Encoding::MsgpackSnappy`]: MessagePack with named fields, the whole
//!   message compressed with raw (block format) Snappy. Carried by
//!   [`super::frame::Framing::LengthPrefixed`].

use std::error::Error as StdError;
use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Kind};

/// Serialization scheme of frame payloads.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Json,
    MsgpackSnappy,
}

impl Encoding {
    /// Serialize a message into frame payload bytes.
    pub fn encode<T: Serialize + ?Sized>(self, message: &T) -> Result<Bytes, CodecError> {
        match self {
            Self::Json => serde_json::to_vec(message)
                .map(Bytes::from)
                .map_err(CodecError::Json),
            Self::MsgpackSnappy => {
                let packed = rmp_serde::to_vec_named(message).map_err(CodecError::MsgpackEncode)?;
                snap::raw::Encoder::new()
                    .compress_vec(&packed)
                    .map(Bytes::from)
                    .map_err(CodecError::Snappy)
            }
        }
    }

    /// Deserialize frame payload bytes into a message.
    pub fn decode<T: DeserializeOwned>(self, payload: &[u8]) -> Result<T, CodecError> {
        match self {
            Self::Json => serde_json::from_slice(payload).map_err(CodecError::Json),
            Self::MsgpackSnappy => {
                let packed = snap::raw::Decoder::new()
                    .decompress_vec(payload)
                    .map_err(CodecError::Snappy)?;
                rmp_serde::from_slice(&packed).map_err(CodecError::MsgpackDecode)
            }
        }
    }
}

/// Failure to encode or decode a frame payload.
#[non_exhaustive]
#[derive(Debug)]
pub enum CodecError {
    Json(serde_json::Error),
    MsgpackEncode(rmp_serde::encode::Error),
    MsgpackDecode(rmp_serde::decode::Error),
    Snappy(snap::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "json: {e}"),
            Self::MsgpackEncode(e) => write!(f, "msgpack encode: {e}"),
            Self::MsgpackDecode(e) => write!(f, "msgpack decode: {e}"),
            Self::Snappy(e) => write!(f, "snappy: {e}"),
        }
    }
}

impl StdError for CodecError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::MsgpackEncode(e) => Some(e),
            Self::MsgpackDecode(e) => Some(e),
            Self::Snappy(e) => Some(e),
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}
