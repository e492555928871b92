//! Public API for the `chatwire` library.
//!
//! This crate provides the realtime message channel used by a chat
//! application: one persistent, bidirectional connection per conversation,
//! a one-byte-tag binary frame protocol, and a layered error taxonomy the
//! rest of the application can react to.
//!
//! The entry point is [`MessageChannel::establish`], which resolves an
//! authenticated connection target through an injected
//! [`ConnectTargetResolver`], opens the injected [`transport::SocketTransport`]
//! and returns a live [`Connection`]. The connection exposes imperative
//! outbound operations (`send`, `mark_read`, `edit_message`,
//! `delete_message`, `close`) and a single lazy inbound stream of typed
//! [`ChannelEvent`]s.
//!
//! ```ignore
//! let channel = MessageChannel::new(resolver, transport);
//! let mut connection = channel.establish(ContactId::new(42)).await?;
//! let mut events = connection.events();
//!
//! connection.send("hello").await?;
//! while let Some(event) = events.next().await {
//!     match event? {
//!         ChannelEvent::Message(message) => ui.append(message),
//!         ChannelEvent::ReadReceipt(update) => ui.advance_read_cursor(update),
//!     }
//! }
//! connection.close().await?;
//! ```

pub mod channel;
pub mod connection;
pub mod error;
pub mod event;
pub mod frame;
pub mod transport;
pub mod wire;

pub use channel::{ChannelConfig, ConnectTargetResolver, MessageChannel};
pub use connection::{ChannelEvents, Connection};
pub use error::{ChannelConnectionError, ChannelError, RemoteError, ResolveTargetError, SendError};
pub use event::{ChannelEvent, ContactId, Message, MessageId, ReadReceiptUpdate};
pub use frame::{Frame, FrameDecodeError, FrameTag, IncomingFrame, IncomingTag, OutgoingFrame, OutgoingTag};
pub use transport::{
    ConnectTarget,
    FrameSocket,
    SocketTransport,
    TransportConnectionError,
    TransportEstablishError,
};
