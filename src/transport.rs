//! The duplex-transport seam the host application implements.
//!
//! `chatwire` never opens sockets itself. The application supplies a
//! [`SocketTransport`] that performs the handshake against a
//! [`ConnectTarget`] and yields a [`FrameSocket`]: one live duplex socket
//! delivering and accepting whole frames. WebSocket stacks fit this shape
//! directly; any transport that preserves frame boundaries will do.
//!
//! Failures are reported through two closed taxonomies, split by phase:
//! [`TransportEstablishError`] for the handshake and
//! [`TransportConnectionError`] for an open socket. The conversions in
//! [`crate::error`] map both onto the channel-level taxonomies.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// An authenticated connection target: URL plus request headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectTarget {
    url: String,
    headers: Vec<(String, String)>,
}

impl ConnectTarget {
    /// Create a target for `url` with no headers.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Append a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The target URL.
    #[must_use]
    pub fn url(&self) -> &str { &self.url }

    /// The request headers, in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
}

/// Errors raised while opening the transport.
#[derive(Debug, Error)]
pub enum TransportEstablishError {
    /// The target URL could not be parsed or used.
    #[error("connection target url is invalid")]
    InvalidUrl,
    /// The server rejected the credentials.
    #[error("handshake rejected: unauthorized")]
    Unauthorized,
    /// The conversation endpoint does not exist.
    #[error("handshake rejected: not found")]
    NotFound,
    /// The credentials are valid but do not grant access.
    #[error("handshake rejected: forbidden")]
    Forbidden,
    /// The handshake failed without a recognisable cause.
    #[error("handshake failed")]
    Unknown,
    /// Any other transport failure.
    #[error("transport failure during handshake")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised by an open socket.
#[derive(Debug, Error)]
pub enum TransportConnectionError {
    /// The connection dropped.
    #[error("connection lost")]
    Disconnected,
    /// The socket delivered data the channel cannot interpret.
    #[error("unsupported data on connection")]
    UnsupportedData,
    /// Any other transport failure.
    #[error("transport failure on connection")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Opens duplex sockets against authenticated targets.
#[async_trait]
pub trait SocketTransport: Send + Sync {
    /// Perform the handshake and return a live socket.
    ///
    /// A failed handshake must not leave a half-open socket behind.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportEstablishError`] describing why the handshake
    /// failed.
    async fn connect(
        &self,
        target: ConnectTarget,
    ) -> Result<Box<dyn FrameSocket>, TransportEstablishError>;
}

/// One live duplex socket exchanging whole frames.
#[async_trait]
pub trait FrameSocket: Send {
    /// Wait for the next inbound frame.
    ///
    /// Returns `None` when the peer closed the connection cleanly. The
    /// future must be cancel-safe: dropping it mid-poll must not lose a
    /// partially received frame.
    async fn read_frame(&mut self) -> Option<Result<Bytes, TransportConnectionError>>;

    /// Write one frame, completing once the transport accepted it.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportConnectionError`] when the write fails.
    async fn write_frame(&mut self, frame: Bytes) -> Result<(), TransportConnectionError>;

    /// Close the socket, completing once the close finished.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportConnectionError`] when the close fails.
    async fn close(&mut self) -> Result<(), TransportConnectionError>;
}
