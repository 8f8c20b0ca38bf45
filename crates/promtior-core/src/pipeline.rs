//! Single-flight send pipeline
//!
//! A send is split in two halves around the network call so a front end can
//! run the request in the background and keep drawing:
//!
//! - [`SendState::begin`] checks the guards, locks the state, echoes the user
//!   message, shows the typing row and disables the input.
//! - [`SendState::finish`] hides the typing row and renders either the
//!   normalized reply or the error banner. The lock release, input re-enable
//!   and refocus happen in a drop guard, so they run on every exit path.
//!
//! [`SendPipeline::send`] runs both halves around one backend call for
//! callers that can simply await.

use std::time::Instant;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::client::ChatBackend;
use crate::error::SendError;
use crate::payload;
use crate::state::ChatRole;

/// The only error text ever shown to the user.
pub const ERROR_BANNER_TEXT: &str =
    "Hubo un problema al hablar con el asistente. Revisá la consola o la configuración.";

/// What the pipeline needs from a front end.
pub trait ChatView {
    fn append_message(&mut self, role: ChatRole, text: &str);
    fn set_typing(&mut self, typing: bool);
    fn set_error(&mut self, text: &str);
    fn clear_error(&mut self);
    fn clear_input(&mut self);
    fn set_input_enabled(&mut self, enabled: bool);
    fn focus_input(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendState {
    #[default]
    Idle,
    Sending,
}

/// An in-flight send. Must be handed back to [`SendState::finish`].
#[derive(Debug)]
#[must_use = "a started send has to be finished to release the input"]
pub struct PendingSend {
    input: String,
    started: Instant,
}

impl PendingSend {
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl SendState {
    pub fn is_sending(&self) -> bool {
        *self == SendState::Sending
    }

    /// Start a send. Empty input and overlapping sends are rejected without
    /// touching the view.
    pub fn begin<V: ChatView>(&mut self, view: &mut V, text: &str) -> Result<PendingSend, SendError> {
        if text.trim().is_empty() {
            return Err(SendError::EmptyInput);
        }
        if self.is_sending() {
            debug!("dropping submission while another send is in flight");
            return Err(SendError::AlreadySending);
        }

        *self = SendState::Sending;
        view.clear_error();
        view.clear_input();
        view.set_input_enabled(false);

        view.append_message(ChatRole::User, text);
        view.set_typing(true);

        Ok(PendingSend {
            input: text.to_string(),
            started: Instant::now(),
        })
    }

    /// Complete a send with the backend's result. Returns the text rendered
    /// as the bot message.
    pub fn finish<V: ChatView>(
        &mut self,
        view: &mut V,
        pending: PendingSend,
        result: Result<Value, SendError>,
    ) -> Result<String, SendError> {
        let mut release = Release { state: self, view };
        release.view.set_typing(false);

        let elapsed_ms = pending.started.elapsed().as_millis() as u64;
        match result {
            Ok(reply) => {
                let text = payload::normalize(reply);
                info!(elapsed_ms, chars = text.chars().count(), "reply received");
                release.view.append_message(ChatRole::Bot, &text);
                Ok(text)
            }
            Err(err) => {
                error!(elapsed_ms, error = %err, "send failed");
                release.view.set_error(ERROR_BANNER_TEXT);
                Err(err)
            }
        }
    }
}

/// Releases the send lock and hands the input back to the user when dropped.
struct Release<'a, V: ChatView> {
    state: &'a mut SendState,
    view: &'a mut V,
}

impl<V: ChatView> Drop for Release<'_, V> {
    fn drop(&mut self) {
        *self.state = SendState::Idle;
        self.view.set_input_enabled(true);
        self.view.focus_input();
    }
}

/// A backend plus the state that keeps its sends from overlapping.
pub struct SendPipeline<B> {
    backend: B,
    state: SendState,
}

impl<B: ChatBackend> SendPipeline<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: SendState::Idle,
        }
    }

    pub fn state(&self) -> SendState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one send to completion. Dropping the returned future while the
    /// request is in flight still hides the typing row and unlocks the input.
    pub async fn send<V: ChatView>(&mut self, view: &mut V, text: &str) -> Result<String, SendError> {
        let pending = self.state.begin(view, text)?;
        let mut in_flight = InFlight {
            state: &mut self.state,
            view,
            finished: false,
        };
        let result = self.backend.invoke(pending.input()).await;
        in_flight.finished = true;
        in_flight.state.finish(&mut *in_flight.view, pending, result)
    }
}

/// Covers the await in [`SendPipeline::send`]; a no-op once `finish` runs.
struct InFlight<'a, V: ChatView> {
    state: &'a mut SendState,
    view: &'a mut V,
    finished: bool,
}

impl<V: ChatView> Drop for InFlight<'_, V> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("send dropped before the reply arrived");
        self.view.set_typing(false);
        *self.state = SendState::Idle;
        self.view.set_input_enabled(true);
        self.view.focus_input();
    }
}
