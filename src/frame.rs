//! Frame encoding and decoding for the channel wire format.
//!
//! A frame is the unit exchanged over the persistent connection: a single
//! tag byte followed by an opaque payload. Outgoing and incoming frames use
//! different tag sets, so each direction validates its tag independently.
//! The codec never inspects payload bytes; interpreting them is the job of
//! the [`crate::wire`] records.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Tag byte reserved for heartbeat frames in both directions.
///
/// Heartbeats carry no application payload and are never surfaced as
/// channel events.
pub const HEARTBEAT_TAG: u8 = 0;

/// Discriminators for frames written to the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OutgoingTag {
    /// Keep-alive frame with an empty payload.
    Heartbeat = HEARTBEAT_TAG,
    /// Send a new text message.
    Message = 1,
    /// Advance the read watermark.
    ReadReceipt = 2,
    /// Replace the text of an existing message.
    EditMessage = 3,
    /// Delete an existing message.
    DeleteMessage = 4,
}

/// Discriminators for frames read from the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum IncomingTag {
    /// Keep-alive frame with an empty payload.
    Heartbeat = HEARTBEAT_TAG,
    /// A message delivered to this conversation.
    Message = 1,
    /// The peer's read watermark advanced.
    ReadReceipt = 2,
    /// The server reported a channel-level error.
    Error = 255,
}

/// Conversion between a tag set and its wire byte.
///
/// Implemented by [`OutgoingTag`] and [`IncomingTag`] so [`Frame`] can
/// validate each direction against its own closed set.
pub trait FrameTag: Copy {
    /// Parse a wire byte, returning `None` when the byte does not belong to
    /// this direction's tag set.
    fn from_byte(byte: u8) -> Option<Self>
    where
        Self: Sized;

    /// The wire byte for this tag.
    fn into_byte(self) -> u8;
}

impl FrameTag for OutgoingTag {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            HEARTBEAT_TAG => Some(Self::Heartbeat),
            1 => Some(Self::Message),
            2 => Some(Self::ReadReceipt),
            3 => Some(Self::EditMessage),
            4 => Some(Self::DeleteMessage),
            _ => None,
        }
    }

    fn into_byte(self) -> u8 { self as u8 }
}

impl FrameTag for IncomingTag {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            HEARTBEAT_TAG => Some(Self::Heartbeat),
            1 => Some(Self::Message),
            2 => Some(Self::ReadReceipt),
            255 => Some(Self::Error),
            _ => None,
        }
    }

    fn into_byte(self) -> u8 { self as u8 }
}

/// Errors produced when parsing a raw frame.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameDecodeError {
    /// The input was empty, so there is no tag byte.
    #[error("empty frame has no tag byte")]
    Empty,
    /// The first byte is not a tag in this direction's set.
    #[error("unrecognised frame tag {0:#04x}")]
    UnknownTag(u8),
}

/// One tagged unit of data exchanged over the connection.
///
/// Constructed immediately before a write or parsed immediately after a
/// read; frames are never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame<T> {
    /// Direction-specific discriminator.
    pub tag: T,
    /// Opaque payload bytes.
    pub payload: Bytes,
}

/// A frame headed to the server.
pub type OutgoingFrame = Frame<OutgoingTag>;
/// A frame received from the server.
pub type IncomingFrame = Frame<IncomingTag>;

impl<T: FrameTag> Frame<T> {
    /// Create a frame from a tag and payload.
    #[must_use]
    pub fn new(tag: T, payload: Bytes) -> Self { Self { tag, payload } }

    /// Encode the frame as the tag byte followed by the payload.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.payload.len());
        buf.put_u8(self.tag.into_byte());
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    /// Parse a raw frame, validating the tag against this direction's set.
    ///
    /// The payload is sliced out of `bytes` without copying and is not
    /// inspected.
    ///
    /// # Errors
    ///
    /// Returns [`FrameDecodeError::Empty`] for empty input and
    /// [`FrameDecodeError::UnknownTag`] when the first byte is outside the
    /// tag set.
    pub fn decode(bytes: Bytes) -> Result<Self, FrameDecodeError> {
        let Some(&first) = bytes.first() else {
            return Err(FrameDecodeError::Empty);
        };
        let tag = T::from_byte(first).ok_or(FrameDecodeError::UnknownTag(first))?;
        Ok(Self {
            tag,
            payload: bytes.slice(1..),
        })
    }
}
