//! HTTP event source backed by `reqwest`

use super::sse::{forward_frames, StreamEnd};
use super::{ChatRequest, EventSource, StreamError, StreamEvent, StreamHandle};
use crate::config::ClientConfig;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Streams answers from the service at `endpoint` with one POST per question
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: Client,
    endpoint: String,
}

impl HttpEventSource {
    pub fn new(config: &ClientConfig) -> Result<Self, StreamError> {
        // No overall request timeout: answers stream for as long as they take.
        // Idle time between events is bounded by the controller.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(StreamError::from)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl EventSource for HttpEventSource {
    fn open(&self, request: ChatRequest) -> StreamHandle {
        let (handle, tx, cancel) = StreamHandle::channel();
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();

        tokio::spawn(async move {
            run_stream(&client, &endpoint, &request, &tx, &cancel).await;
        });

        handle
    }
}

async fn run_stream(
    client: &Client,
    endpoint: &str,
    request: &ChatRequest,
    tx: &mpsc::Sender<StreamEvent>,
    cancel: &CancellationToken,
) {
    let start = std::time::Instant::now();
    tracing::debug!(
        endpoint = %endpoint,
        history_len = request.history.len(),
        "Opening answer stream"
    );

    let send = client
        .post(endpoint)
        .header(ACCEPT, "text/event-stream")
        .json(request)
        .send();

    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!("Stream cancelled before response");
            return;
        }
        result = send => result,
    };

    let response = match response {
        Ok(r) => r,
        Err(e) => {
            let err = StreamError::from(e);
            tracing::warn!(error = %err, kind = ?err.kind, "Answer request failed");
            let _ = tx.send(StreamEvent::TransportError(err.to_string())).await;
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(status = %status, "Stream cancelled while reading error body");
                return;
            }
            body = read_error_body(response) => body,
        };
        let err = StreamError::status(status, &body);
        tracing::warn!(status = %status, error = %err, "Answering service returned an error");
        let _ = tx.send(StreamEvent::TransportError(err.to_string())).await;
        return;
    }

    // Dropping the body stream at the end of this call closes the connection
    let summary = forward_frames(response.bytes_stream(), tx, cancel).await;

    match summary.end {
        StreamEnd::Eof => tracing::warn!(
            fragments = summary.fragments,
            duration_ms = %start.elapsed().as_millis(),
            "Answer stream ended without a completion marker"
        ),
        end => tracing::debug!(
            fragments = summary.fragments,
            duration_ms = %start.elapsed().as_millis(),
            end = ?end,
            "Answer stream closed"
        ),
    }
}

/// Upper bound on how much of an error body is read for diagnostics
const MAX_ERROR_BODY_BYTES: usize = 4096;

/// Read the start of an error body. Consumes the response, so the connection
/// is dropped rather than drained.
async fn read_error_body(mut response: reqwest::Response) -> String {
    let mut body = Vec::new();
    while body.len() < MAX_ERROR_BODY_BYTES {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "Error body truncated");
                break;
            }
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
