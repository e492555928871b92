//! The per-connection socket actor.
//!
//! One task owns the socket for the lifetime of a connection. A `biased`
//! `tokio::select!` loop polls the cancellation token, the command channel
//! carrying caller writes, the lazy-start trigger, the socket read, and
//! the bounded event queue. Gating flags keep at most one inbound frame in
//! flight between the socket and the queue, so events reach the consumer
//! in arrival order and a slow consumer never blocks writes or teardown.
//!
//! A terminal inbound error tears the socket down and stops the actor, so
//! every later operation on the connection fails as disconnected. A clean
//! transport closure only ends the event sequence; the socket stays open
//! for the caller's own `close()`.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    error::{ChannelConnectionError, RemoteError},
    event::ChannelEvent,
    frame::{IncomingFrame, IncomingTag},
    transport::{FrameSocket, TransportConnectionError},
    wire::{ErrorRecord, MessageRecord, ReadReceiptRecord, WirePayload},
};

/// One item delivered through the event queue.
pub(super) type EventItem = Result<ChannelEvent, ChannelConnectionError>;

/// A caller operation forwarded to the actor.
pub(super) enum Command {
    /// Write an encoded frame; `done` resolves when the write finished.
    Write {
        frame: Bytes,
        done: oneshot::Sender<Result<(), TransportConnectionError>>,
    },
    /// Close the socket and stop the actor; `done` resolves when the close
    /// finished.
    Close {
        done: oneshot::Sender<Result<(), TransportConnectionError>>,
    },
}

/// Tracks the last delivered message id to spot holes in the sequence.
///
/// A mismatch is logged and delivery continues; gap recovery is the
/// consumer's concern.
#[derive(Default)]
struct GapTracker {
    last: Option<u64>,
}

impl GapTracker {
    fn observe(&mut self, record: &MessageRecord) {
        if let Some(expected) = record.previous_message_id {
            if self.last.is_some_and(|last| last != expected) {
                warn!(
                    message_id = record.id,
                    expected_previous = expected,
                    last_delivered = ?self.last,
                    "gap in message sequence",
                );
            }
        }
        self.last = Some(record.id);
    }
}

/// Drive the socket until the connection is closed or cancelled.
pub(super) async fn run(
    mut socket: Box<dyn FrameSocket>,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<EventItem>,
    start: oneshot::Receiver<()>,
    shutdown: CancellationToken,
) {
    let mut events = Some(events);
    let mut start = Some(start);
    let mut pending: Option<EventItem> = None;
    let mut pumping = false;
    let mut gap = GapTracker::default();

    loop {
        let mut clear_events = false;

        tokio::select! {
            biased;

            () = shutdown.cancelled() => {
                if let Err(error) = socket.close().await {
                    debug!(%error, "socket close during shutdown failed");
                }
                return;
            }

            command = commands.recv() => match command {
                Some(Command::Write { frame, done }) => {
                    let result = socket.write_frame(frame).await;
                    if let Err(error) = &result {
                        warn!(%error, "outbound frame write failed");
                    }
                    let _ = done.send(result);
                }
                Some(Command::Close { done }) => {
                    let _ = done.send(socket.close().await);
                    return;
                }
                None => {
                    // The Connection handle is gone; tear the socket down.
                    if let Err(error) = socket.close().await {
                        debug!(%error, "socket close after handle drop failed");
                    }
                    return;
                }
            },

            started = recv_start(&mut start), if start.is_some() && !pumping => {
                start = None;
                if started {
                    pumping = true;
                } else {
                    // The event stream was dropped before its first poll;
                    // the socket is never read.
                    clear_events = true;
                }
            }

            frame = socket.read_frame(), if pumping && pending.is_none() && events.is_some() => {
                match frame {
                    Some(Ok(bytes)) => match handle_frame(bytes, &mut gap) {
                        Ok(Some(event)) => pending = Some(Ok(event)),
                        Ok(None) => {}
                        Err(error) => {
                            pending = Some(Err(error));
                            pumping = false;
                        }
                    },
                    Some(Err(error)) => {
                        pending = Some(Err(error.into()));
                        pumping = false;
                    }
                    None => {
                        // Clean transport closure: the sequence finishes
                        // with no error.
                        clear_events = true;
                        pumping = false;
                    }
                }
            }

            permit = reserve_event(&events), if pending.is_some() && events.is_some() => {
                // The queue loan must be fully consumed before `events` can
                // be touched, so outcomes are applied after the match.
                let mut sequence_over = false;
                let mut consumer_lost = false;
                match permit {
                    Some(permit) => {
                        if let Some(item) = pending.take() {
                            sequence_over = item.is_err();
                            permit.send(item);
                        }
                    }
                    None => consumer_lost = true,
                }
                if sequence_over {
                    // A terminal inbound error closes the connection; later
                    // operations must observe it as gone.
                    if let Err(error) = socket.close().await {
                        debug!(%error, "socket close after terminal inbound error failed");
                    }
                    return;
                }
                if consumer_lost {
                    // Consumer went away mid-stream.
                    let failed = pending.take().is_some_and(|item| item.is_err());
                    clear_events = true;
                    pumping = false;
                    if failed {
                        if let Err(error) = socket.close().await {
                            debug!(%error, "socket close after terminal inbound error failed");
                        }
                        return;
                    }
                }
            }

            () = consumer_gone(&events), if pumping && pending.is_none() && events.is_some() => {
                clear_events = true;
                pumping = false;
            }
        }

        if clear_events {
            events = None;
        }
    }
}

async fn recv_start(start: &mut Option<oneshot::Receiver<()>>) -> bool {
    match start.as_mut() {
        Some(receiver) => receiver.await.is_ok(),
        None => std::future::pending().await,
    }
}

async fn reserve_event(
    events: &Option<mpsc::Sender<EventItem>>,
) -> Option<mpsc::Permit<'_, EventItem>> {
    match events {
        Some(sender) => sender.reserve().await.ok(),
        None => std::future::pending().await,
    }
}

async fn consumer_gone(events: &Option<mpsc::Sender<EventItem>>) {
    match events {
        Some(sender) => sender.closed().await,
        None => std::future::pending().await,
    }
}

/// Interpret one raw inbound frame.
///
/// Returns `Ok(None)` for heartbeats, `Ok(Some)` for a data frame, and an
/// error when the frame must terminate the event sequence.
fn handle_frame(
    bytes: Bytes,
    gap: &mut GapTracker,
) -> Result<Option<ChannelEvent>, ChannelConnectionError> {
    let frame = IncomingFrame::decode(bytes)
        .map_err(|_| ChannelConnectionError::UnsupportedData)?;
    match frame.tag {
        IncomingTag::Heartbeat => {
            trace!("heartbeat frame");
            Ok(None)
        }
        IncomingTag::Error => match ErrorRecord::from_bytes(&frame.payload) {
            Ok((record, _)) => Err(ChannelConnectionError::Other(Box::new(RemoteError::from(
                record,
            )))),
            Err(_) => Err(ChannelConnectionError::UnsupportedData),
        },
        IncomingTag::Message | IncomingTag::ReadReceipt => {
            decode_event(&frame.payload, gap).map(Some)
        }
    }
}

/// Decode a data-frame payload into a channel event.
///
/// The message shape is tried first, then the receipt shape; the payloads
/// are not self-describing beyond the frame tag, which has already been
/// validated. A candidate decode only counts when it consumes the whole
/// payload. Adding a third payload shape without tightening this
/// disambiguation risks misreading malformed frames of the new shape as
/// one of these two.
fn decode_event(
    payload: &[u8],
    gap: &mut GapTracker,
) -> Result<ChannelEvent, ChannelConnectionError> {
    if let Ok((record, consumed)) = MessageRecord::from_bytes(payload) {
        if consumed == payload.len() {
            gap.observe(&record);
            return Ok(ChannelEvent::Message(record.into()));
        }
    }
    if let Ok((record, consumed)) = ReadReceiptRecord::from_bytes(payload) {
        if consumed == payload.len() {
            return Ok(ChannelEvent::ReadReceipt(record.into()));
        }
    }
    Err(ChannelConnectionError::UnsupportedData)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::frame::IncomingFrame;

    fn frame_bytes(tag: IncomingTag, payload: &impl WirePayload) -> Bytes {
        let payload = payload.to_bytes().expect("encode should succeed");
        IncomingFrame::new(tag, Bytes::from(payload)).encode()
    }

    fn message_record(id: u64) -> MessageRecord {
        MessageRecord {
            id,
            text: "hi".to_owned(),
            sender_id: 7,
            is_read: false,
            created_at: 1_722_470_400_000,
            previous_message_id: None,
        }
    }

    #[test]
    fn message_payload_decodes_to_a_message_event() {
        let mut gap = GapTracker::default();
        let bytes = frame_bytes(IncomingTag::Message, &message_record(1));
        let event = handle_frame(bytes, &mut gap).expect("frame should decode");
        assert!(matches!(event, Some(ChannelEvent::Message(_))));
    }

    #[test]
    fn receipt_payload_falls_through_to_the_receipt_shape() {
        let mut gap = GapTracker::default();
        let record = ReadReceiptRecord {
            contact_id: 7,
            until_message_id: 9,
            timestamp: 1_722_470_400_000,
        };
        let bytes = frame_bytes(IncomingTag::ReadReceipt, &record);
        let event = handle_frame(bytes, &mut gap).expect("frame should decode");
        assert!(matches!(event, Some(ChannelEvent::ReadReceipt(_))));
    }

    #[test]
    fn garbage_payload_is_unsupported_data() {
        let mut gap = GapTracker::default();
        let bytes = IncomingFrame::new(
            IncomingTag::Message,
            Bytes::from_static(&[0xff, 0xfe, 0xfd]),
        )
        .encode();
        assert!(matches!(
            handle_frame(bytes, &mut gap),
            Err(ChannelConnectionError::UnsupportedData)
        ));
    }

    #[test]
    fn trailing_bytes_disqualify_a_candidate_decode() {
        let mut gap = GapTracker::default();
        let mut payload = message_record(1).to_bytes().expect("encode should succeed");
        payload.extend_from_slice(&[0x00, 0x01]);
        assert!(matches!(
            decode_event(&payload, &mut gap),
            Err(ChannelConnectionError::UnsupportedData)
        ));
    }

    #[test]
    fn heartbeat_frames_are_skipped() {
        let mut gap = GapTracker::default();
        let bytes = IncomingFrame::new(IncomingTag::Heartbeat, Bytes::new()).encode();
        let event = handle_frame(bytes, &mut gap).expect("heartbeat should be accepted");
        assert!(event.is_none());
    }

    #[test]
    fn parsed_error_frame_carries_the_remote_cause() {
        let mut gap = GapTracker::default();
        let record = ErrorRecord {
            code: 401,
            message: "token expired".to_owned(),
        };
        let bytes = frame_bytes(IncomingTag::Error, &record);
        let error = handle_frame(bytes, &mut gap).expect_err("error frame should terminate");
        let ChannelConnectionError::Other(cause) = error else {
            panic!("expected Other, got {error:?}");
        };
        let remote = cause
            .downcast::<RemoteError>()
            .expect("cause should be the remote error");
        assert_eq!(remote.code, 401);
    }

    #[test]
    fn unparseable_error_frame_is_unsupported_data() {
        let mut gap = GapTracker::default();
        let bytes =
            IncomingFrame::new(IncomingTag::Error, Bytes::from_static(&[0x80])).encode();
        assert!(matches!(
            handle_frame(bytes, &mut gap),
            Err(ChannelConnectionError::UnsupportedData)
        ));
    }
}
