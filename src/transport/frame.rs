//! Framing of messages on the TCP stream.
//!
//! A frame carries exactly one serialized message. Two wire schemes exist and
//! a connection uses exactly one of them for both directions:
//!
//! - [`Framing::Lines`]: a JSON message followed by a single `\n` delimiter
//! - [`Framing::LengthPrefixed`]: a 4-byte big-endian unsigned length followed
//!   by exactly that many bytes of Snappy-compressed MessagePack
//!
//! ```text
//! Lines:           {"type":"tick",...}\n
//! LengthPrefixed:  [00 00 00 14]<snappy(msgpack)>
//! ```
//!
//! [`FrameCodec`] plugs into [`tokio_util::codec::FramedRead`] and
//! [`tokio_util::codec::FramedWrite`]; it yields raw payload bytes and leaves
//! message decoding to the [`Encoding`] returned by [`Framing::encoding`].

use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use tokio_util::codec;

use super::codec::Encoding;
use super::error::TransportError;

const DELIMITER: u8 = b'\n';
const LENGTH_PREFIX_SIZE: usize = 4;

/// Wire framing of a connection.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// Newline-delimited frames
    #[default]
    Lines,
    /// 4-byte big-endian length prefix followed by the payload
    LengthPrefixed,
}

impl Framing {
    /// Payload encoding carried by this framing.
    #[must_use]
    pub const fn encoding(self) -> Encoding {
        match self {
            Self::Lines => Encoding::Json,
            Self::LengthPrefixed => Encoding::MsgpackSnappy,
        }
    }
}

/// Encoder and decoder for the configured [`Framing`].
#[derive(Debug, Clone)]
pub struct FrameCodec {
    framing: Framing,
    max_frame_length: usize,
    /// Offset up to which the buffer was already searched for a delimiter
    next_index: usize,
}

impl FrameCodec {
    #[must_use]
    pub fn new(framing: Framing, max_frame_length: usize) -> Self {
        Self {
            framing,
            max_frame_length,
            next_index: 0,
        }
    }

    #[must_use]
    pub fn framing(&self) -> Framing {
        self.framing
    }

    fn decode_line(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, TransportError> {
        let search_from = self.next_index.min(src.len());
        let Some(offset) = src[search_from..].iter().position(|b| *b == DELIMITER) else {
            if src.len() > self.max_frame_length {
                return Err(TransportError::FrameTooLarge {
                    length: src.len(),
                    max: self.max_frame_length,
                });
            }
            self.next_index = src.len();
            return Ok(None);
        };

        let end = search_from + offset;
        self.next_index = 0;
        if end > self.max_frame_length {
            return Err(TransportError::FrameTooLarge {
                length: end,
                max: self.max_frame_length,
            });
        }

        let mut line = src.split_to(end + 1);
        line.truncate(end);
        if line.last() == Some(&b'\r') {
            line.truncate(end - 1);
        }

        Ok(Some(line.freeze()))
    }

    fn decode_length_prefixed(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<Bytes>, TransportError> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let mut header = [0_u8; LENGTH_PREFIX_SIZE];
        header.copy_from_slice(&src[..LENGTH_PREFIX_SIZE]);
        let length = u32::from_be_bytes(header) as usize;

        if length > self.max_frame_length {
            return Err(TransportError::FrameTooLarge {
                length,
                max: self.max_frame_length,
            });
        }

        if src.len() < LENGTH_PREFIX_SIZE + length {
            src.reserve(LENGTH_PREFIX_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_SIZE);
        Ok(Some(src.split_to(length).freeze()))
    }
}

impl codec::Decoder for FrameCodec {
    type Item = Bytes;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.framing {
            Framing::Lines => self.decode_line(src),
            Framing::LengthPrefixed => self.decode_length_prefixed(src),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        match self.framing {
            // A trailing line without delimiter is still a complete message
            Framing::Lines if !src.is_empty() => {
                self.next_index = 0;
                Ok(Some(src.split().freeze()))
            }
            Framing::Lines => Ok(None),
            Framing::LengthPrefixed if src.is_empty() => Ok(None),
            Framing::LengthPrefixed => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream ended inside a length-prefixed frame",
            ))),
        }
    }
}

impl codec::Encoder<Bytes> for FrameCodec {
    type Error = TransportError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_frame_length {
            return Err(TransportError::FrameTooLarge {
                length: item.len(),
                max: self.max_frame_length,
            });
        }

        match self.framing {
            Framing::Lines => {
                dst.reserve(item.len() + 1);
                dst.extend_from_slice(&item);
                dst.put_u8(DELIMITER);
            }
            Framing::LengthPrefixed => {
                let length =
                    u32::try_from(item.len()).map_err(|_e| TransportError::FrameTooLarge {
                        length: item.len(),
                        max: u32::MAX as usize,
                    })?;
                dst.reserve(LENGTH_PREFIX_SIZE + item.len());
                dst.put_u32(length);
                dst.extend_from_slice(&item);
            }
        }

        Ok(())
    }
}
