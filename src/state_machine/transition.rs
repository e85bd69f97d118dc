//! Pure state transition function
//!
//! Given the same state, context and event, `transition` always produces the
//! same new state and effects. All I/O and log edits happen in the runtime
//! when it executes the effects.

use super::message::Message;
use super::state::ExchangeId;
use super::{ConvContext, ConvState, Effect, Event};
use crate::stream::StreamEvent;
use crate::transport::{TransportError, TransportErrorKind};
use thiserror::Error;

pub const CONNECTION_APOLOGY: &str =
    "Connection error: could not reach the server. Please make sure the backend is running.";
pub const UNEXPECTED_APOLOGY: &str = "An unexpected error occurred.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    #[must_use]
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Events the state machine refuses. Refusal never changes state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A reply is still in progress")]
    Busy,
    #[error("Event from exchange {0} does not match the exchange in flight")]
    StaleEvent(ExchangeId),
}

/// Pure transition function
///
/// # Errors
///
/// Refuses blank messages, messages sent while busy, and stream events that
/// do not belong to the exchange in flight. A refusal never changes state.
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User messages
        // ============================================================
        (_, Event::UserMessage { text, .. }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyMessage)
        }

        // Idle + UserMessage -> Awaiting
        (ConvState::Idle, Event::UserMessage { text, exchange }) => {
            let text = text.trim().to_string();
            Ok(TransitionResult::new(ConvState::Awaiting { exchange })
                .with_effect(Effect::append(Message::user(text.clone())))
                .with_effect(Effect::append(Message::pending_assistant()))
                .with_effect(Effect::PostMessage { text, exchange }))
        }

        // Busy + UserMessage -> reject
        (ConvState::Awaiting { .. } | ConvState::Streaming { .. }, Event::UserMessage { .. }) => {
            Err(TransitionError::Busy)
        }

        // ============================================================
        // Reset, allowed from any state
        // ============================================================
        (_, Event::Reset) => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::AbortStream)
            .with_effect(Effect::PostReset)
            .with_effect(Effect::ReplaceLog {
                greeting: Message::assistant(context.reset_greeting.clone()),
            })),

        // ============================================================
        // Reply stream for the exchange in flight
        // ============================================================
        (
            ConvState::Awaiting { exchange: current } | ConvState::Streaming { exchange: current },
            Event::Stream { exchange, event },
        ) if *current == exchange => Ok(apply_stream_event(state, exchange, event)),

        // Body closed without `done`: treated as a normal completion
        (
            ConvState::Awaiting { exchange: current } | ConvState::Streaming { exchange: current },
            Event::StreamEnded { exchange },
        ) if *current == exchange => {
            Ok(TransitionResult::new(ConvState::Idle).with_effect(Effect::FinishPending))
        }

        (
            ConvState::Awaiting { exchange: current } | ConvState::Streaming { exchange: current },
            Event::TransportFailed { exchange, error },
        ) if *current == exchange => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::fail_pending(apology_for(&error)))),

        // Anything else belongs to an exchange that is over or abandoned
        (
            _,
            Event::Stream { exchange, .. }
            | Event::StreamEnded { exchange }
            | Event::TransportFailed { exchange, .. },
        ) => Err(TransitionError::StaleEvent(exchange)),
    }
}

fn apply_stream_event(state: &ConvState, exchange: ExchangeId, event: StreamEvent) -> TransitionResult {
    match event {
        // Awaiting/Streaming + Content -> Streaming
        StreamEvent::Content { text } => TransitionResult::new(ConvState::Streaming { exchange })
            .with_effect(Effect::append_to_pending(text)),

        // Awaiting/Streaming + Done -> Idle
        StreamEvent::Done => TransitionResult::new(ConvState::Idle).with_effect(Effect::FinishPending),

        // Server gave up mid-reply -> Idle, stop listening
        StreamEvent::ServerError { message } => TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::fail_pending(server_apology(&message)))
            .with_effect(Effect::AbortStream),

        // Already logged by the decoder
        StreamEvent::MalformedFragment { .. } => TransitionResult::new(*state),
    }
}

/// User-facing text replacing a reply that failed in transport
#[must_use]
pub fn apology_for(error: &TransportError) -> String {
    match error.kind {
        TransportErrorKind::Connection => CONNECTION_APOLOGY.to_string(),
        TransportErrorKind::Server { .. } => server_apology(&error.message),
        TransportErrorKind::Unexpected => UNEXPECTED_APOLOGY.to_string(),
    }
}

fn server_apology(detail: &str) -> String {
    if detail.trim().is_empty() {
        "Server error: the reply could not be completed.".to_string()
    } else {
        format!("Server error: {detail}")
    }
}
