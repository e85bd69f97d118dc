//! Events that can occur in a conversation

use super::state::ExchangeId;
use crate::stream::StreamEvent;
use crate::transport::TransportError;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    UserMessage {
        text: String,
        /// Id the exchange gets if the message is accepted
        exchange: ExchangeId,
    },
    Reset,

    // Stream events
    Stream {
        exchange: ExchangeId,
        event: StreamEvent,
    },
    /// Body closed without a `done` frame
    StreamEnded { exchange: ExchangeId },

    // Transport events
    TransportFailed {
        exchange: ExchangeId,
        error: TransportError,
    },
}

impl Event {
    #[must_use]
    pub fn content(exchange: ExchangeId, text: impl Into<String>) -> Self {
        Event::Stream {
            exchange,
            event: StreamEvent::content(text),
        }
    }

    #[must_use]
    pub fn done(exchange: ExchangeId) -> Self {
        Event::Stream {
            exchange,
            event: StreamEvent::Done,
        }
    }
}
