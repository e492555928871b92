//! Typed payload records carried inside frames.
//!
//! Payloads are serialised with bincode's standard configuration. Outgoing
//! records each know their frame tag; incoming records are decoded by the
//! connection pump after the tag byte has been validated by the frame
//! codec.

use bincode::{
    BorrowDecode,
    Encode,
    borrow_decode_from_slice,
    config,
    encode_to_vec,
    error::{DecodeError, EncodeError},
};

use crate::frame::OutgoingTag;

/// Wrapper trait for payload record types.
///
/// Any type deriving [`Encode`] and [`BorrowDecode`] automatically
/// implements this trait via a blanket implementation. The default methods
/// serialise and deserialise using bincode's standard configuration.
pub trait WirePayload: Encode + for<'de> BorrowDecode<'de, ()> {
    /// Serialise the record into a byte vector.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if serialisation fails.
    fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        encode_to_vec(self, config::standard())
    }

    /// Deserialise a record from a byte slice, returning the record and the
    /// number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if deserialisation fails.
    fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), DecodeError>
    where
        Self: Sized,
    {
        borrow_decode_from_slice(bytes, config::standard())
    }
}

impl<T> WirePayload for T where for<'de> T: Encode + BorrowDecode<'de, ()> {}

/// An outgoing payload record bound to its frame tag.
pub trait OutboundPayload: WirePayload {
    /// The tag under which this record is framed.
    const TAG: OutgoingTag;
}

/// Payload of a send-text frame.
#[derive(Clone, Debug, PartialEq, Eq, Encode, BorrowDecode)]
pub struct SendText {
    /// UTF-8 message body.
    pub text: String,
}

impl OutboundPayload for SendText {
    const TAG: OutgoingTag = OutgoingTag::Message;
}

/// Payload of a read-receipt frame: advance the read watermark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, BorrowDecode)]
pub struct MarkRead {
    /// Every message with an id at or below this value is now read.
    pub until_message_id: u64,
}

impl OutboundPayload for MarkRead {
    const TAG: OutgoingTag = OutgoingTag::ReadReceipt;
}

/// Payload of an edit frame.
#[derive(Clone, Debug, PartialEq, Eq, Encode, BorrowDecode)]
pub struct Edit {
    /// Id of the message being edited.
    pub message_id: u64,
    /// Replacement text.
    pub text: String,
}

impl OutboundPayload for Edit {
    const TAG: OutgoingTag = OutgoingTag::EditMessage;
}

/// Payload of a delete frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, BorrowDecode)]
pub struct Delete {
    /// Id of the message being deleted.
    pub message_id: u64,
}

impl OutboundPayload for Delete {
    const TAG: OutgoingTag = OutgoingTag::DeleteMessage;
}

/// Payload of an incoming message frame.
#[derive(Clone, Debug, PartialEq, Eq, Encode, BorrowDecode)]
pub struct MessageRecord {
    /// Server-assigned id, unique within the conversation.
    pub id: u64,
    /// UTF-8 message body.
    pub text: String,
    /// Id of the sending contact.
    pub sender_id: u64,
    /// Whether the peer has already read the message.
    pub is_read: bool,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Id of the preceding message, when the server knows it. Used for gap
    /// detection only; absent on the domain type.
    pub previous_message_id: Option<u64>,
}

/// Payload of an incoming read-receipt frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, BorrowDecode)]
pub struct ReadReceiptRecord {
    /// Contact whose read cursor advanced.
    pub contact_id: u64,
    /// Watermark: every message id at or below this value is read.
    pub until_message_id: u64,
    /// Time of the update in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Payload of an incoming server error frame.
#[derive(Clone, Debug, PartialEq, Eq, Encode, BorrowDecode)]
pub struct ErrorRecord {
    /// Server-defined error code.
    pub code: u16,
    /// Human-readable description.
    pub message: String,
}
