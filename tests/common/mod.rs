//! Shared in-memory doubles for behavioural tests.
//!
//! The scripted socket is driven over channels: tests feed inbound frames
//! (or failures) through a [`SocketDriver`] and observe every frame the
//! connection writes.
#![allow(dead_code)]

use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use bytes::Bytes;
use chatwire::{
    ChannelConfig,
    ConnectTargetResolver,
    Connection,
    ContactId,
    MessageChannel,
    ResolveTargetError,
    frame::{IncomingFrame, IncomingTag},
    transport::{
        ConnectTarget,
        FrameSocket,
        SocketTransport,
        TransportConnectionError,
        TransportEstablishError,
    },
    wire::WirePayload,
};
use tokio::sync::mpsc;

/// Socket half handed to the channel under test.
pub struct ScriptedSocket {
    inbound: mpsc::UnboundedReceiver<Result<Bytes, TransportConnectionError>>,
    written: mpsc::UnboundedSender<Bytes>,
    fail_writes: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

/// Test-side controls for a [`ScriptedSocket`].
pub struct SocketDriver {
    inbound: Option<mpsc::UnboundedSender<Result<Bytes, TransportConnectionError>>>,
    /// Every frame the connection wrote, in order.
    pub written: mpsc::UnboundedReceiver<Bytes>,
    fail_writes: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

/// Create a connected socket/driver pair.
pub fn socket_pair() -> (ScriptedSocket, SocketDriver) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (written_tx, written_rx) = mpsc::unbounded_channel();
    let fail_writes = Arc::new(AtomicBool::new(false));
    let closed = Arc::new(AtomicBool::new(false));

    (
        ScriptedSocket {
            inbound: inbound_rx,
            written: written_tx,
            fail_writes: Arc::clone(&fail_writes),
            closed: Arc::clone(&closed),
        },
        SocketDriver {
            inbound: Some(inbound_tx),
            written: written_rx,
            fail_writes,
            closed,
        },
    )
}

impl SocketDriver {
    /// Queue an inbound frame built from `payload` under `tag`.
    pub fn push_frame(&self, tag: IncomingTag, payload: &impl WirePayload) {
        let payload = payload.to_bytes().expect("payload should encode");
        self.push_raw(IncomingFrame::new(tag, Bytes::from(payload)).encode());
    }

    /// Queue raw inbound frame bytes.
    pub fn push_raw(&self, frame: Bytes) {
        self.inbound
            .as_ref()
            .expect("inbound side already finished")
            .send(Ok(frame))
            .expect("socket should still be alive");
    }

    /// Queue an inbound transport failure.
    pub fn push_error(&self, error: TransportConnectionError) {
        self.inbound
            .as_ref()
            .expect("inbound side already finished")
            .send(Err(error))
            .expect("socket should still be alive");
    }

    /// Close the inbound side cleanly: after the queued frames drain, the
    /// socket reports a clean close.
    pub fn finish(&mut self) { self.inbound = None; }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self) { self.fail_writes.store(true, Ordering::SeqCst); }

    /// Whether the connection closed the socket.
    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::SeqCst) }
}

#[async_trait]
impl FrameSocket for ScriptedSocket {
    async fn read_frame(&mut self) -> Option<Result<Bytes, TransportConnectionError>> {
        self.inbound.recv().await
    }

    async fn write_frame(&mut self, frame: Bytes) -> Result<(), TransportConnectionError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportConnectionError::Disconnected);
        }
        self.written
            .send(frame)
            .map_err(|_| TransportConnectionError::Disconnected)
    }

    async fn close(&mut self) -> Result<(), TransportConnectionError> {
        self.closed.store(true, Ordering::SeqCst);
        self.inbound.close();
        Ok(())
    }
}

/// Transport yielding one scripted socket and recording the target it saw.
pub struct ScriptedTransport {
    socket: Mutex<Option<ScriptedSocket>>,
    seen_target: Arc<Mutex<Option<ConnectTarget>>>,
}

impl ScriptedTransport {
    pub fn new(socket: ScriptedSocket) -> Self {
        Self {
            socket: Mutex::new(Some(socket)),
            seen_target: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle to the target recorded by `connect`, for assertions after the
    /// transport has been moved into a channel.
    pub fn seen_target(&self) -> Arc<Mutex<Option<ConnectTarget>>> {
        Arc::clone(&self.seen_target)
    }
}

#[async_trait]
impl SocketTransport for ScriptedTransport {
    async fn connect(
        &self,
        target: ConnectTarget,
    ) -> Result<Box<dyn FrameSocket>, TransportEstablishError> {
        *self.seen_target.lock().expect("target lock") = Some(target);
        self.socket
            .lock()
            .expect("socket lock")
            .take()
            .map(|socket| Box::new(socket) as Box<dyn FrameSocket>)
            .ok_or(TransportEstablishError::Unknown)
    }
}

/// Transport whose handshake fails once with the given error.
pub struct FailingTransport {
    error: Mutex<Option<TransportEstablishError>>,
}

impl FailingTransport {
    pub fn new(error: TransportEstablishError) -> Self {
        Self {
            error: Mutex::new(Some(error)),
        }
    }
}

#[async_trait]
impl SocketTransport for FailingTransport {
    async fn connect(
        &self,
        _target: ConnectTarget,
    ) -> Result<Box<dyn FrameSocket>, TransportEstablishError> {
        Err(self
            .error
            .lock()
            .expect("error lock")
            .take()
            .expect("handshake error already consumed"))
    }
}

/// Resolver returning an authenticated target derived from the contact id.
pub struct StaticResolver {
    base_url: String,
}

impl StaticResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ConnectTargetResolver for StaticResolver {
    async fn resolve(&self, contact_id: ContactId) -> Result<ConnectTarget, ResolveTargetError> {
        Ok(
            ConnectTarget::new(format!("{}/{contact_id}", self.base_url))
                .with_header("Authorization", "Bearer test-token"),
        )
    }
}

/// Resolver failing once with the given error.
pub struct FailingResolver {
    error: Mutex<Option<ResolveTargetError>>,
}

impl FailingResolver {
    pub fn new(error: ResolveTargetError) -> Self {
        Self {
            error: Mutex::new(Some(error)),
        }
    }
}

#[async_trait]
impl ConnectTargetResolver for FailingResolver {
    async fn resolve(&self, _contact_id: ContactId) -> Result<ConnectTarget, ResolveTargetError> {
        Err(self
            .error
            .lock()
            .expect("error lock")
            .take()
            .expect("resolver error already consumed"))
    }
}

/// Establish a connection over a scripted socket with default config.
pub async fn connected() -> (Connection, SocketDriver) {
    connected_with_config(ChannelConfig::default()).await
}

/// Establish a connection over a scripted socket with explicit buffers.
pub async fn connected_with_config(config: ChannelConfig) -> (Connection, SocketDriver) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (socket, driver) = socket_pair();
    let channel = MessageChannel::with_config(
        StaticResolver::new("wss://chat.example.test/realtime"),
        ScriptedTransport::new(socket),
        config,
    );
    let connection = channel
        .establish(ContactId::new(7))
        .await
        .expect("establish should succeed");
    (connection, driver)
}
