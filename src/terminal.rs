//! Line-oriented terminal front end
//!
//! Questions are echoed by the terminal itself, so only assistant output is
//! printed. The live answer is written incrementally as it grows.

use crate::controller::{ConversationController, SubmitError};
use crate::projection::{messages, Message, Origin};
use crate::state_machine::SessionState;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

/// The streaming answer as far as it has been printed
#[derive(Debug)]
struct LiveAnswer {
    /// `SessionState::submissions` when this answer started
    submission: u64,
    shown: String,
}

/// Tracks what has already been written so each update prints only the delta.
///
/// States arrive coalesced, so one update may span a failure, a new
/// submission and its first tokens. The live answer is matched by submission
/// number, never by position.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    /// Number of settled (non-live) messages already handled
    settled: usize,
    live: Option<LiveAnswer>,
}

impl TranscriptPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to print for the transition to `state`
    pub fn update(&mut self, state: &SessionState) -> String {
        let msgs = messages(state);
        let (settled, live) = match msgs.split_last() {
            Some((last, rest)) if last.is_live => (rest, Some(last)),
            _ => (msgs.as_slice(), None),
        };
        let new_answers: Vec<&Message> = settled
            .iter()
            .skip(self.settled)
            .filter(|m| m.origin == Origin::Assistant)
            .collect();
        self.settled = settled.len();

        let mut out = String::new();

        // The answer that was streaming is the earliest one that can have settled
        let mut resumed = None;
        if let Some(prev) = self.live.take() {
            let still_streaming = live.is_some() && prev.submission == state.submissions;
            let completed = new_answers
                .first()
                .is_some_and(|m| m.text.starts_with(prev.shown.as_str()));

            if still_streaming {
                self.live = Some(prev);
            } else if completed {
                resumed = Some(prev.shown);
            } else {
                if !prev.shown.is_empty() {
                    out.push('\n');
                }
                let failure = state
                    .last_failure
                    .as_ref()
                    .filter(|_| prev.submission == state.submissions);
                match failure {
                    Some(failure) => {
                        out.push_str(&format!("[answer failed: {}]\n\n", failure.detail));
                    }
                    None if prev.submission == state.submissions => out.push_str("[cancelled]\n\n"),
                    None => out.push_str("[answer discarded]\n\n"),
                }
            }
        }

        for (i, msg) in new_answers.iter().enumerate() {
            let text = match (i, resumed.as_deref()) {
                (0, Some(shown)) => msg.text.strip_prefix(shown).unwrap_or(msg.text.as_str()),
                _ => msg.text.as_str(),
            };
            out.push_str(text);
            out.push_str("\n\n");
        }

        if let Some(msg) = live {
            let entry = self.live.get_or_insert_with(|| LiveAnswer {
                submission: state.submissions,
                shown: String::new(),
            });
            match msg.text.strip_prefix(entry.shown.as_str()) {
                Some(rest) => out.push_str(rest),
                None => {
                    out.push('\n');
                    out.push_str(&msg.text);
                }
            }
            entry.shown.clone_from(&msg.text);
        }

        out
    }
}

/// Print state changes until the conversation shuts down
pub async fn render(rx: watch::Receiver<SessionState>) {
    let mut printer = TranscriptPrinter::new();
    let mut states = WatchStream::new(rx);
    while let Some(state) = states.next().await {
        let out = printer.update(&state);
        if out.is_empty() {
            continue;
        }
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(out.as_bytes()).and_then(|()| stdout.flush()) {
            tracing::warn!(error = %e, "Failed to write to stdout");
            return;
        }
    }
}

/// Ask each line of `input` as a question, one at a time.
///
/// The next line is read only once the previous answer has settled. Ctrl-C
/// abandons the current answer, or returns when idle. Returns at EOF.
pub async fn ask_lines<R>(controller: &ConversationController, input: R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut state = controller.subscribe();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { return Ok(()) };
                match controller.submit(&line).await {
                    Ok(()) | Err(SubmitError::EmptyInput) => {}
                    Err(e) => eprintln!("{e}"),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                return Ok(());
            }
        }

        tokio::select! {
            _ = state.wait_for(|s| !s.is_busy()) => {}
            signal = tokio::signal::ctrl_c() => {
                signal?;
                controller.cancel().await;
            }
        }
    }
}
