//! Session runtime task

use super::{Command, SubmitError};
use crate::state_machine::{transition, Effect, Event, SessionState, TransitionError};
use crate::stream::{EventSource, StreamError, StreamEvent, StreamHandle};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use uuid::Uuid;

/// The stream currently feeding the session
struct InFlight {
    stream_id: Uuid,
    /// Remembered until completion, when it becomes the turn's question
    question: String,
    handle: StreamHandle,
    fragments: usize,
    /// Idle timeout is measured from here, not from the last loop iteration
    last_event_at: Instant,
}

/// Owns the session state and applies every fold, one at a time
pub(crate) struct SessionRuntime<E: EventSource> {
    state: SessionState,
    source: E,
    command_rx: mpsc::Receiver<Command>,
    state_tx: watch::Sender<SessionState>,
    in_flight: Option<InFlight>,
    idle_timeout: Option<Duration>,
}

impl<E: EventSource> SessionRuntime<E> {
    pub fn new(
        state: SessionState,
        source: E,
        command_rx: mpsc::Receiver<Command>,
        state_tx: watch::Sender<SessionState>,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            state,
            source,
            command_rx,
            state_tx,
            in_flight: None,
            idle_timeout,
        }
    }

    pub async fn run(mut self) {
        tracing::debug!("Starting conversation runtime");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                event = next_stream_event(self.in_flight.as_mut(), self.idle_timeout) => {
                    self.handle_stream_event(event);
                }
            }
        }

        // Controller dropped mid-stream: release the connection
        if self.in_flight.is_some() {
            tracing::info!("Conversation closed with a stream in flight, cancelling");
            let _ = self.apply(Event::CancelRequested);
        }

        tracing::debug!("Conversation runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { question, reply } => {
                let result = self
                    .apply(Event::SubmitStarted { question })
                    .map_err(SubmitError::from);
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "Submission rejected");
                }
                let _ = reply.send(result);
            }
            Command::Cancel { reply } => {
                if let Some(in_flight) = &self.in_flight {
                    tracing::info!(
                        stream_id = %in_flight.stream_id,
                        fragments = in_flight.fragments,
                        "Cancelling answer stream"
                    );
                }
                let _ = self.apply(Event::CancelRequested);
                let _ = reply.send(());
            }
        }
    }

    fn handle_stream_event(&mut self, event: StreamEvent) {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return;
        };

        in_flight.last_event_at = Instant::now();
        match &event {
            StreamEvent::Token(_) => in_flight.fragments += 1,
            StreamEvent::Completed => tracing::info!(
                stream_id = %in_flight.stream_id,
                fragments = in_flight.fragments,
                "Answer complete"
            ),
            StreamEvent::TransportError(detail) | StreamEvent::ParseError(detail) => {
                tracing::warn!(
                    stream_id = %in_flight.stream_id,
                    fragments = in_flight.fragments,
                    error = %detail,
                    "Answer stream failed, discarding partial answer"
                );
            }
        }

        let event = Event::from_stream(event, &in_flight.question);
        if let Err(e) = self.apply(event) {
            tracing::error!(error = %e, "Stream event rejected");
        }
    }

    /// Fold one event into the state and execute the resulting effects
    fn apply(&mut self, event: Event) -> Result<(), TransitionError> {
        let name = event.name();
        let result = transition(&self.state, event)?;

        if result.effects.is_empty() {
            tracing::trace!(event = name, "Event dropped while idle");
        }

        self.state = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect);
        }
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::OpenStream { request } => {
                // Single flight: the state machine only opens from idle, which
                // means no stream is held here
                if let Some(stale) = self.in_flight.take() {
                    stale.handle.cancel();
                }

                let stream_id = Uuid::new_v4();
                tracing::info!(
                    stream_id = %stream_id,
                    question_len = request.question.len(),
                    history_len = request.history.len(),
                    "Opening answer stream"
                );

                let question = request.question.clone();
                let handle = self.source.open(request);
                self.in_flight = Some(InFlight {
                    stream_id,
                    question,
                    handle,
                    fragments: 0,
                    last_event_at: Instant::now(),
                });
            }

            Effect::CloseStream => {
                if let Some(in_flight) = self.in_flight.take() {
                    in_flight.handle.cancel();
                    tracing::debug!(stream_id = %in_flight.stream_id, "Answer stream released");
                }
            }

            Effect::PublishState => {
                self.state_tx.send_replace(self.state.clone());
            }
        }
    }
}

/// Wait for the next event of the in-flight stream.
///
/// Never resolves while idle. A stream that closes without a terminal event,
/// or stays silent past the idle timeout, yields a transport error.
async fn next_stream_event(
    in_flight: Option<&mut InFlight>,
    idle_timeout: Option<Duration>,
) -> StreamEvent {
    let Some(in_flight) = in_flight else {
        return std::future::pending().await;
    };

    let next = match idle_timeout {
        Some(limit) => match tokio::time::timeout_at(
            in_flight.last_event_at + limit,
            in_flight.handle.next(),
        )
        .await
        {
            Ok(next) => next,
            Err(_) => {
                let err = StreamError::timeout(format!(
                    "no response from answering service for {}ms",
                    limit.as_millis()
                ));
                return StreamEvent::TransportError(err.to_string());
            }
        },
        None => in_flight.handle.next().await,
    };

    next.unwrap_or_else(|| {
        StreamEvent::TransportError(
            StreamError::network("stream ended before the answer completed").to_string(),
        )
    })
}
