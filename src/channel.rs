//! Channel establishment.
//!
//! [`MessageChannel`] owns the two injected collaborators: a
//! [`ConnectTargetResolver`] that builds an authenticated connection target
//! (refreshing credentials as needed), and a
//! [`SocketTransport`](crate::transport::SocketTransport) that performs the
//! handshake. `establish` is the only way to obtain a
//! [`Connection`].

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    connection::Connection,
    error::{ChannelError, ResolveTargetError},
    event::ContactId,
    transport::{ConnectTarget, SocketTransport},
};

/// Builds the authenticated connection target for one conversation.
///
/// Implemented outside this crate; the implementation may refresh an
/// access token before returning. Raising
/// [`ResolveTargetError::SignedOut`] or
/// [`ResolveTargetError::RequestCreation`] short-circuits establishment
/// with the matching [`ChannelError`] member, unchanged.
#[async_trait]
pub trait ConnectTargetResolver: Send + Sync {
    /// Resolve the connection target for `contact_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveTargetError`] when no target can be built.
    async fn resolve(&self, contact_id: ContactId) -> Result<ConnectTarget, ResolveTargetError>;
}

/// Buffer sizes for a connection's internal channels.
///
/// Both values are clamped to at least 1.
#[derive(Clone, Copy, Debug)]
pub struct ChannelConfig {
    /// Capacity of the inbound event queue between the read pump and the
    /// consumer.
    pub event_buffer: usize,
    /// Capacity of the outbound command queue.
    pub command_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            event_buffer: 32,
            command_buffer: 8,
        }
    }
}

/// Factory for per-conversation realtime connections.
pub struct MessageChannel<R, T> {
    resolver: R,
    transport: T,
    config: ChannelConfig,
}

impl<R, T> MessageChannel<R, T>
where
    R: ConnectTargetResolver,
    T: SocketTransport,
{
    /// Create a channel with the default [`ChannelConfig`].
    #[must_use]
    pub fn new(resolver: R, transport: T) -> Self {
        Self::with_config(resolver, transport, ChannelConfig::default())
    }

    /// Create a channel with explicit buffer sizes.
    #[must_use]
    pub fn with_config(resolver: R, transport: T, config: ChannelConfig) -> Self {
        Self {
            resolver,
            transport,
            config,
        }
    }

    /// Open a connection for the conversation with `contact_id`.
    ///
    /// Resolves the authenticated target, performs the transport handshake
    /// and wraps the socket in a [`Connection`]. Nothing fallible happens
    /// after a successful handshake, so a failed `establish` never leaves a
    /// half-open socket behind.
    ///
    /// # Errors
    ///
    /// Recognised resolver failures pass through unchanged
    /// ([`ChannelError::UserInitiatedSignOut`],
    /// [`ChannelError::RequestCreationFailed`]); unrecognised ones fold to
    /// [`ChannelError::Unknown`]. Handshake failures are classified into
    /// the remaining [`ChannelError`] members.
    pub async fn establish(&self, contact_id: ContactId) -> Result<Connection, ChannelError> {
        let target = self.resolver.resolve(contact_id).await.map_err(|error| {
            if let ResolveTargetError::Other(cause) = &error {
                warn!(%contact_id, %cause, "unrecognised connect-target resolver failure");
            }
            ChannelError::from(error)
        })?;

        debug!(%contact_id, url = target.url(), "opening realtime channel");
        let socket = self
            .transport
            .connect(target)
            .await
            .map_err(ChannelError::from)?;

        Ok(Connection::spawn(socket, self.config))
    }
}

impl<R, T> std::fmt::Debug for MessageChannel<R, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageChannel")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
