//! Conversation state types

use crate::config::ClientConfig;
use crate::session::ConversationId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one send/receive exchange within a conversation.
///
/// Stream events carry the id of the exchange that produced them, so events
/// from an abandoned exchange can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeId(pub u64);

impl ExchangeId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready for user input, nothing in flight
    #[default]
    Idle,

    /// Message posted, no reply content yet
    Awaiting { exchange: ExchangeId },

    /// Reply content arriving
    Streaming { exchange: ExchangeId },
}

impl ConvState {
    /// A send is in flight; new sends are rejected
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !matches!(self, ConvState::Idle)
    }

    /// The exchange currently in flight, if any
    #[must_use]
    pub fn exchange(&self) -> Option<ExchangeId> {
        match self {
            ConvState::Idle => None,
            ConvState::Awaiting { exchange } | ConvState::Streaming { exchange } => Some(*exchange),
        }
    }
}

/// Context for a conversation (immutable configuration)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub conversation_id: ConversationId,
    /// First assistant message of a new conversation
    pub greeting: String,
    /// Assistant message shown after a reset
    pub reset_greeting: String,
}

impl ConvContext {
    #[must_use]
    pub fn new(
        conversation_id: ConversationId,
        greeting: impl Into<String>,
        reset_greeting: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id,
            greeting: greeting.into(),
            reset_greeting: reset_greeting.into(),
        }
    }

    #[must_use]
    pub fn from_config(conversation_id: ConversationId, config: &ClientConfig) -> Self {
        Self::new(
            conversation_id,
            config.greeting.clone(),
            config.reset_greeting.clone(),
        )
    }
}
