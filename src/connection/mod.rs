//! One live connection to a conversation.
//!
//! A [`Connection`] wraps exactly one duplex socket. The socket is owned by
//! a spawned actor task (see [`pump`]); the handle communicates with it
//! over a bounded command channel, and every outbound operation suspends
//! until its own socket write has finished. The inbound side is a single
//! lazy [`ChannelEvents`] stream.
//!
//! Connections are created only by
//! [`MessageChannel::establish`](crate::MessageChannel::establish) and are
//! not reusable: after [`close`](Connection::close), or once the event
//! sequence has terminated, a fresh `establish` call is required.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::{
    channel::ChannelConfig,
    error::{ChannelConnectionError, SendError},
    event::MessageId,
    frame::OutgoingFrame,
    transport::FrameSocket,
    wire::{Delete, Edit, MarkRead, OutboundPayload, SendText},
};

mod events;
mod pump;

pub use events::ChannelEvents;

/// A live, per-conversation duplex connection.
pub struct Connection {
    commands: mpsc::Sender<pump::Command>,
    events: Option<ChannelEvents>,
    shutdown: CancellationToken,
}

impl Connection {
    /// Spawn the socket actor and return the caller-facing handle.
    pub(crate) fn spawn(socket: Box<dyn FrameSocket>, config: ChannelConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        let (start_tx, start_rx) = oneshot::channel();
        let shutdown = CancellationToken::new();

        tokio::spawn(pump::run(
            socket,
            command_rx,
            event_tx,
            start_rx,
            shutdown.clone(),
        ));

        Self {
            commands: command_tx,
            events: Some(ChannelEvents::new(event_rx, start_tx)),
            shutdown,
        }
    }

    /// Take the inbound event sequence.
    ///
    /// The sequence is single-pass: the first call returns the live stream,
    /// and any later call returns a stream that is already over. No socket
    /// reads happen until the returned stream is first polled.
    #[must_use]
    pub fn events(&mut self) -> ChannelEvents {
        self.events.take().unwrap_or_else(ChannelEvents::exhausted)
    }

    /// Send a text message.
    ///
    /// Suspends until the frame has been written to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Encoding`] if the payload cannot be serialised,
    /// or [`SendError::Connection`] when the write fails or the connection
    /// is already closed. A failed send never produces an inbound event.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.write_payload(&SendText { text: text.into() }).await
    }

    /// Advance the read watermark: every message with an id at or below
    /// `until` is marked read.
    ///
    /// # Errors
    ///
    /// Same contract as [`send`](Self::send).
    pub async fn mark_read(&self, until: MessageId) -> Result<(), SendError> {
        self.write_payload(&MarkRead {
            until_message_id: until.as_u64(),
        })
        .await
    }

    /// Replace the text of an existing message.
    ///
    /// # Errors
    ///
    /// Same contract as [`send`](Self::send).
    pub async fn edit_message(
        &self,
        id: MessageId,
        text: impl Into<String>,
    ) -> Result<(), SendError> {
        self.write_payload(&Edit {
            message_id: id.as_u64(),
            text: text.into(),
        })
        .await
    }

    /// Delete an existing message.
    ///
    /// # Errors
    ///
    /// Same contract as [`send`](Self::send).
    pub async fn delete_message(&self, id: MessageId) -> Result<(), SendError> {
        self.write_payload(&Delete {
            message_id: id.as_u64(),
        })
        .await
    }

    /// Close the underlying socket, suspending until the close finished.
    ///
    /// Call at most once: closing is not idempotent and a second call fails
    /// with [`ChannelConnectionError::Disconnected`]. Dropping the
    /// connection without closing tears the socket down in the background.
    ///
    /// # Errors
    ///
    /// Returns the transport's close failure, or
    /// [`ChannelConnectionError::Disconnected`] when the connection is
    /// already gone.
    pub async fn close(&mut self) -> Result<(), ChannelConnectionError> {
        let (done, done_rx) = oneshot::channel();
        self.commands
            .send(pump::Command::Close { done })
            .await
            .map_err(|_| ChannelConnectionError::Disconnected)?;
        match done_rx.await {
            Ok(result) => result.map_err(ChannelConnectionError::from),
            Err(_) => Err(ChannelConnectionError::Disconnected),
        }
    }

    /// Encode `payload` under its tag and round-trip the write through the
    /// socket actor.
    async fn write_payload<P: OutboundPayload>(&self, payload: &P) -> Result<(), SendError> {
        let bytes = payload.to_bytes().map_err(SendError::Encoding)?;
        let frame = OutgoingFrame::new(P::TAG, Bytes::from(bytes)).encode();
        let (done, done_rx) = oneshot::channel();
        self.commands
            .send(pump::Command::Write { frame, done })
            .await
            .map_err(|_| SendError::Connection(ChannelConnectionError::Disconnected))?;
        match done_rx.await {
            Ok(result) => result.map_err(|error| SendError::Connection(error.into())),
            Err(_) => Err(SendError::Connection(ChannelConnectionError::Disconnected)),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Stop the actor and release the socket even without a close() call.
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("events_taken", &self.events.is_none())
            .finish_non_exhaustive()
    }
}
