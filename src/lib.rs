//! Gravel Chat - streaming question/answer client
//!
//! A conversation is a pure state machine folded over events. The
//! controller owns the only copy of the state, opens one answer stream at a
//! time, and publishes every change to observers.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod config;
pub mod controller;
pub mod projection;
pub mod state_machine;
pub mod stream;
pub mod terminal;

pub use config::ClientConfig;
pub use controller::{ConversationController, SubmitError};
pub use state_machine::SessionState;
pub use stream::HttpEventSource;
