//! Server-sent frame decoding
//!
//! Turns a response byte stream into [`StreamEvent`]s using the
//! `eventsource-stream` crate for SSE framing. Event names and ids are
//! ignored; only the data payload matters.

use super::types::{StreamEvent, TokenFrame};
use super::StreamError;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::stream::{Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Payload of the sentinel frame that ends a stream
pub const DONE_MARKER: &str = "[DONE]";

/// Decode one frame payload
pub fn decode_frame(data: &str) -> StreamEvent {
    if data == DONE_MARKER {
        return StreamEvent::Completed;
    }
    match serde_json::from_str::<TokenFrame>(data) {
        Ok(frame) => StreamEvent::Token(frame.data),
        Err(e) => StreamEvent::ParseError(
            StreamError::decode(format!("invalid frame payload: {e}")).to_string(),
        ),
    }
}

/// How a forwarded stream stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// A terminal event was forwarded
    Terminal,
    /// The body ended without a terminal event
    Eof,
    /// The handle was cancelled or dropped
    Cancelled,
}

/// Summary of a forwarded stream, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardSummary {
    pub fragments: usize,
    pub end: StreamEnd,
}

/// Read SSE frames from `bytes` and push decoded events onto `tx`.
///
/// Stops after the first terminal event, on cancellation, or when the
/// receiver goes away. Events are never reordered or deduplicated.
pub async fn forward_frames<S, B, E>(
    bytes: S,
    tx: &mpsc::Sender<StreamEvent>,
    cancel: &CancellationToken,
) -> ForwardSummary
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut frames = std::pin::pin!(bytes.eventsource());
    let mut fragments = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return ForwardSummary { fragments, end: StreamEnd::Cancelled };
            }
            next = frames.next() => next,
        };

        let Some(result) = next else {
            return ForwardSummary {
                fragments,
                end: StreamEnd::Eof,
            };
        };

        let event = match result {
            Ok(frame) => decode_frame(&frame.data),
            Err(e) => classify_stream_error(&e),
        };

        if matches!(event, StreamEvent::Token(_)) {
            fragments += 1;
        }
        let terminal = event.is_terminal();

        // A cancelled handle must not observe further events
        if cancel.is_cancelled() || tx.send(event).await.is_err() {
            return ForwardSummary {
                fragments,
                end: StreamEnd::Cancelled,
            };
        }

        if terminal {
            return ForwardSummary {
                fragments,
                end: StreamEnd::Terminal,
            };
        }
    }
}

fn classify_stream_error<E: Display>(e: &EventStreamError<E>) -> StreamEvent {
    match e {
        EventStreamError::Transport(inner) => {
            StreamEvent::TransportError(StreamError::network(format!("stream error: {inner}")).to_string())
        }
        EventStreamError::Utf8(_) | EventStreamError::Parser(_) => {
            StreamEvent::ParseError(StreamError::decode(format!("malformed frame: {e}")).to_string())
        }
    }
}
