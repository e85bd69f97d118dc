//! Effects produced by state transitions

use super::message::Message;
use super::state::ExchangeId;

/// Effects to be executed, in order, after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a finished message, or a new pending reply
    AppendMessage { message: Message },

    /// Extend the pending reply with a fragment
    AppendToPending { text: String },

    /// Mark the pending reply complete
    FinishPending,

    /// Replace the pending reply's text with an apology and complete it
    FailPending { text: String },

    /// Replace the whole log with a single greeting
    ReplaceLog { greeting: Message },

    /// Post the message and start consuming its reply stream
    PostMessage { text: String, exchange: ExchangeId },

    /// Ask the server to clear its history for this conversation
    PostReset,

    /// Stop reading the reply stream in flight, if any
    AbortStream,
}

impl Effect {
    #[must_use]
    pub fn append(message: Message) -> Self {
        Effect::AppendMessage { message }
    }

    #[must_use]
    pub fn append_to_pending(text: impl Into<String>) -> Self {
        Effect::AppendToPending { text: text.into() }
    }

    #[must_use]
    pub fn fail_pending(text: impl Into<String>) -> Self {
        Effect::FailPending { text: text.into() }
    }

    /// True for effects that change the message log
    #[must_use]
    pub fn edits_log(&self) -> bool {
        matches!(
            self,
            Effect::AppendMessage { .. }
                | Effect::AppendToPending { .. }
                | Effect::FinishPending
                | Effect::FailPending { .. }
                | Effect::ReplaceLog { .. }
        )
    }
}
