//! Channel-side error taxonomies and the transport error classifier.
//!
//! Errors are strictly layered: the transport reports through its own
//! taxonomies ([`TransportEstablishError`], [`TransportConnectionError`]),
//! and the `From` conversions in this module classify them into the
//! channel-level sets callers react to. Each conversion is a pure, total
//! mapping with an `Other` escape hatch, so classification itself can
//! never fail; causes are re-wrapped, never discarded, except where the
//! establishment contract requires folding unrecognised resolver failures
//! to [`ChannelError::Unknown`].

use thiserror::Error;

use crate::transport::{TransportConnectionError, TransportEstablishError};

/// Errors surfaced by [`crate::MessageChannel::establish`].
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The resolved connection target URL is invalid.
    #[error("connection target url is invalid")]
    InvalidUrl,
    /// The server rejected the credentials.
    #[error("connection rejected: unauthorized")]
    Unauthorized,
    /// The conversation endpoint does not exist.
    #[error("conversation endpoint not found")]
    NotFound,
    /// The credentials do not grant access to the conversation.
    #[error("connection rejected: forbidden")]
    Forbidden,
    /// Establishment failed without a recognisable cause.
    #[error("connection failed")]
    Unknown,
    /// A sign-out completed while the connection target was being resolved.
    #[error("signed out while establishing the connection")]
    UserInitiatedSignOut,
    /// The authenticated connection request could not be built.
    #[error("building the connection request failed")]
    RequestCreationFailed,
    /// Any other transport failure during establishment.
    #[error("transport failure while establishing the connection")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors surfaced through the inbound event sequence and outbound writes.
#[derive(Debug, Error)]
pub enum ChannelConnectionError {
    /// The connection dropped.
    #[error("connection lost")]
    Disconnected,
    /// A frame arrived that the channel cannot interpret.
    #[error("unsupported data on connection")]
    UnsupportedData,
    /// Any other failure on the open connection.
    #[error("connection failure")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised by a [`crate::ConnectTargetResolver`].
///
/// The recognised members map one-to-one onto [`ChannelError`] so the
/// resolver's internal state transitions (a completed sign-out, a request
/// builder failure) are honoured exactly once; anything else folds to
/// [`ChannelError::Unknown`].
#[derive(Debug, Error)]
pub enum ResolveTargetError {
    /// The user signed out; no target can or should be built.
    #[error("user is signed out")]
    SignedOut,
    /// The authenticated request could not be constructed.
    #[error("connection request could not be built")]
    RequestCreation,
    /// Any other resolver failure.
    #[error("resolving the connection target failed")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors returned by the outbound operations on a [`crate::Connection`].
#[derive(Debug, Error)]
pub enum SendError {
    /// Serialising the outbound payload failed. The connection stays open.
    #[error("failed to encode outbound payload")]
    Encoding(#[source] bincode::error::EncodeError),
    /// The write failed at the transport.
    #[error(transparent)]
    Connection(ChannelConnectionError),
}

/// A channel-level error reported by the server in an error frame.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("server reported error {code}: {message}")]
pub struct RemoteError {
    /// Server-defined error code.
    pub code: u16,
    /// Human-readable description.
    pub message: String,
}

impl From<crate::wire::ErrorRecord> for RemoteError {
    fn from(record: crate::wire::ErrorRecord) -> Self {
        Self {
            code: record.code,
            message: record.message,
        }
    }
}

impl From<TransportEstablishError> for ChannelError {
    fn from(error: TransportEstablishError) -> Self {
        match error {
            TransportEstablishError::InvalidUrl => Self::InvalidUrl,
            TransportEstablishError::Unauthorized => Self::Unauthorized,
            TransportEstablishError::NotFound => Self::NotFound,
            TransportEstablishError::Forbidden => Self::Forbidden,
            TransportEstablishError::Unknown => Self::Unknown,
            TransportEstablishError::Other(cause) => Self::Other(cause),
        }
    }
}

impl From<TransportConnectionError> for ChannelConnectionError {
    fn from(error: TransportConnectionError) -> Self {
        match error {
            TransportConnectionError::Disconnected => Self::Disconnected,
            TransportConnectionError::UnsupportedData => Self::UnsupportedData,
            TransportConnectionError::Other(cause) => Self::Other(cause),
        }
    }
}

impl From<ResolveTargetError> for ChannelError {
    fn from(error: ResolveTargetError) -> Self {
        match error {
            ResolveTargetError::SignedOut => Self::UserInitiatedSignOut,
            ResolveTargetError::RequestCreation => Self::RequestCreationFailed,
            ResolveTargetError::Other(_) => Self::Unknown,
        }
    }
}
