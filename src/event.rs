//! Domain types yielded by the inbound event sequence.

use crate::wire::{MessageRecord, ReadReceiptRecord};

/// Server-assigned identifier of a message, unique within a conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u64);

impl MessageId {
    /// Create a new [`MessageId`] with the provided value.
    #[must_use]
    pub fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self { Self(value) }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContactId(u64);

impl ContactId {
    /// Create a new [`ContactId`] with the provided value.
    #[must_use]
    pub fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl From<u64> for ContactId {
    fn from(value: u64) -> Self { Self(value) }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message delivered to the conversation.
///
/// Immutable once received: edits and deletes arrive as new channel
/// operations, never as in-place mutation of this type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned id.
    pub id: MessageId,
    /// UTF-8 message body.
    pub text: String,
    /// Contact that sent the message.
    pub sender_id: ContactId,
    /// Whether the peer has already read the message.
    pub is_read: bool,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: MessageId::new(record.id),
            text: record.text,
            sender_id: ContactId::new(record.sender_id),
            is_read: record.is_read,
            created_at: record.created_at,
        }
    }
}

/// A peer's read cursor advanced.
///
/// This is a watermark, not a set: consumers must advance their read cursor
/// to at least [`until_message_id`](Self::until_message_id) and never move
/// it backwards, even if a stale update arrives with a lower value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadReceiptUpdate {
    /// Contact whose cursor advanced.
    pub contact_id: ContactId,
    /// Every message id at or below this value is read.
    pub until_message_id: MessageId,
    /// Time of the update in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ReadReceiptUpdate {
    /// True when `message_id` falls at or below the watermark.
    #[must_use]
    pub fn covers(&self, message_id: MessageId) -> bool {
        message_id <= self.until_message_id
    }
}

impl From<ReadReceiptRecord> for ReadReceiptUpdate {
    fn from(record: ReadReceiptRecord) -> Self {
        Self {
            contact_id: ContactId::new(record.contact_id),
            until_message_id: MessageId::new(record.until_message_id),
            timestamp: record.timestamp,
        }
    }
}

/// One event yielded by the inbound sequence; exactly one per data frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A message arrived.
    Message(Message),
    /// A read watermark advanced.
    ReadReceipt(ReadReceiptUpdate),
}
