//! Lazy, single-pass inbound event stream.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};

use super::pump::EventItem;

/// The inbound event sequence of one [`Connection`](super::Connection).
///
/// The stream is lazy: the underlying socket is not read until the first
/// poll. It is single-pass and never restarts; it ends with `None` after a
/// clean transport closure, or yields one terminal
/// [`ChannelConnectionError`](crate::ChannelConnectionError) and then ends.
/// Dropping the stream cancels the read pump promptly; no further events
/// are produced afterwards.
pub struct ChannelEvents {
    receiver: Option<mpsc::Receiver<EventItem>>,
    start: Option<oneshot::Sender<()>>,
}

impl ChannelEvents {
    pub(super) fn new(receiver: mpsc::Receiver<EventItem>, start: oneshot::Sender<()>) -> Self {
        Self {
            receiver: Some(receiver),
            start: Some(start),
        }
    }

    /// A stream that is already over, returned when the sequence was
    /// consumed once before.
    pub(super) fn exhausted() -> Self {
        Self {
            receiver: None,
            start: None,
        }
    }
}

impl Stream for ChannelEvents {
    type Item = EventItem;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(start) = this.start.take() {
            // First poll: wake the read pump.
            let _ = start.send(());
        }
        let Some(receiver) = this.receiver.as_mut() else {
            return Poll::Ready(None);
        };
        match receiver.poll_recv(cx) {
            Poll::Ready(Some(item)) => {
                if item.is_err() {
                    this.receiver = None;
                }
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                this.receiver = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for ChannelEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelEvents")
            .field("terminated", &self.receiver.is_none())
            .finish_non_exhaustive()
    }
}
