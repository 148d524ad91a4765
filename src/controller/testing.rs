//! Mock event source for testing
//!
//! Records every opened stream and lets the test play the service's side.

use crate::stream::{ChatRequest, EventSource, StreamEvent, StreamHandle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One stream opened through the mock
struct OpenedStream {
    request: ChatRequest,
    tx: Option<mpsc::Sender<StreamEvent>>,
    cancel: CancellationToken,
}

/// Event source whose streams are fed by the test
#[derive(Default)]
pub struct ScriptedEventSource {
    opened: Mutex<Vec<OpenedStream>>,
    /// Streams whose cancellation the producer side has observed
    cancellations: Arc<AtomicUsize>,
}

impl ScriptedEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    /// Request that opened stream `index`
    pub fn request(&self, index: usize) -> ChatRequest {
        self.opened.lock().unwrap()[index].request.clone()
    }

    pub fn cancel_token(&self, index: usize) -> CancellationToken {
        self.opened.lock().unwrap()[index].cancel.clone()
    }

    /// Total streams cancelled so far, as seen by the producer
    pub fn cancel_count(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self, index: usize) -> bool {
        self.opened.lock().unwrap()[index].cancel.is_cancelled()
    }

    /// Deliver an event on stream `index`. Ignored if the consumer is gone.
    pub async fn emit(&self, index: usize, event: StreamEvent) {
        let tx = self.opened.lock().unwrap()[index].tx.clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    /// End stream `index` without a terminal event
    pub fn close(&self, index: usize) {
        self.opened.lock().unwrap()[index].tx = None;
    }
}

impl EventSource for ScriptedEventSource {
    fn open(&self, request: ChatRequest) -> StreamHandle {
        let (handle, tx, cancel) = StreamHandle::channel();

        let observed = cancel.clone();
        let cancellations = Arc::clone(&self.cancellations);
        tokio::spawn(async move {
            observed.cancelled().await;
            cancellations.fetch_add(1, Ordering::SeqCst);
        });

        self.opened.lock().unwrap().push(OpenedStream {
            request,
            tx: Some(tx),
            cancel,
        });
        handle
    }
}
