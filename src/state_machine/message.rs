//! Chat messages and the conversation log

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// One entry in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    /// Assistant reply still being filled in
    pub pending: bool,
}

impl Message {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            pending: false,
        }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            pending: false,
        }
    }

    /// Placeholder for a reply that has not produced any text yet
    #[must_use]
    pub fn pending_assistant() -> Self {
        Self {
            sender: Sender::Assistant,
            text: String::new(),
            pending: true,
        }
    }

    /// Shells show a typing indicator until the first fragment arrives
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.pending && self.text.is_empty()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LogError {
    #[error("a reply is still pending")]
    PendingInProgress,
    #[error("no pending reply to update")]
    NoPendingMessage,
    #[error("only assistant messages can be pending")]
    PendingUserMessage,
}

/// Ordered message log.
///
/// Append-only, except that the most recent entry may be updated while it is
/// pending. At most one entry is pending, and it is always the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    /// Start a log holding only `greeting`
    #[must_use]
    pub fn new(greeting: Message) -> Self {
        let mut log = Self {
            messages: Vec::new(),
        };
        log.replace(greeting);
        log
    }

    /// Append a message to the end of the log
    ///
    /// # Errors
    ///
    /// Fails while a reply is pending, or when asked to append a pending
    /// user message.
    pub fn append(&mut self, message: Message) -> Result<(), LogError> {
        if self.pending().is_some() {
            return Err(LogError::PendingInProgress);
        }
        if message.pending && message.sender != Sender::Assistant {
            return Err(LogError::PendingUserMessage);
        }
        self.messages.push(message);
        Ok(())
    }

    /// Extend the pending reply with the next fragment
    ///
    /// # Errors
    ///
    /// `LogError::NoPendingMessage` when no reply is pending.
    pub fn append_to_pending(&mut self, fragment: &str) -> Result<(), LogError> {
        self.pending_mut()?.text.push_str(fragment);
        Ok(())
    }

    /// Mark the pending reply complete, keeping its text
    ///
    /// # Errors
    ///
    /// `LogError::NoPendingMessage` when no reply is pending.
    pub fn finish_pending(&mut self) -> Result<(), LogError> {
        self.pending_mut()?.pending = false;
        Ok(())
    }

    /// Replace the pending reply's text and mark it complete
    ///
    /// # Errors
    ///
    /// `LogError::NoPendingMessage` when no reply is pending.
    pub fn fail_pending(&mut self, text: String) -> Result<(), LogError> {
        let message = self.pending_mut()?;
        message.text = text;
        message.pending = false;
        Ok(())
    }

    /// Drop everything and start over from `greeting`
    pub fn replace(&mut self, mut greeting: Message) {
        greeting.pending = false;
        self.messages.clear();
        self.messages.push(greeting);
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    #[must_use]
    pub fn pending(&self) -> Option<&Message> {
        self.messages.last().filter(|m| m.pending)
    }

    fn pending_mut(&mut self) -> Result<&mut Message, LogError> {
        self.messages
            .last_mut()
            .filter(|m| m.pending)
            .ok_or(LogError::NoPendingMessage)
    }
}
