//! Event stream adapter
//!
//! Opens a streaming request to the answering service and delivers decoded
//! [`StreamEvent`]s over a channel. One handle owns one connection.

mod error;
mod http;
pub mod sse;
mod types;

pub use error::{StreamError, StreamErrorKind};
pub use http::HttpEventSource;
pub use types::{ChatRequest, StreamEvent};

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of the per-stream event channel
pub const EVENT_BUFFER: usize = 64;

/// Source of answer streams
pub trait EventSource: Send + Sync {
    /// Start a stream for `request`. Returns immediately; events arrive on
    /// the handle as the service produces them.
    fn open(&self, request: ChatRequest) -> StreamHandle;
}

impl<T: EventSource + ?Sized> EventSource for Arc<T> {
    fn open(&self, request: ChatRequest) -> StreamHandle {
        (**self).open(request)
    }
}

/// Receiving end of one open stream.
///
/// Dropping the handle cancels the stream and releases the connection.
#[derive(Debug)]
pub struct StreamHandle {
    events: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
}

impl StreamHandle {
    pub fn new(events: mpsc::Receiver<StreamEvent>, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// Create a handle plus the sending half a producer task writes to
    pub fn channel() -> (Self, mpsc::Sender<StreamEvent>, CancellationToken) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        (Self::new(rx, cancel.clone()), tx, cancel)
    }

    /// Next event, or `None` once the stream has ended or been cancelled
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    /// Close the connection. Idempotent; no events are delivered afterwards.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
