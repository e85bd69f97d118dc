//! Chat service transport
//!
//! The two outbound calls of a conversation (send a message, reset the
//! server-side history), plus a health probe. Every call is a single attempt.

mod error;
mod http;
mod wire;

pub use error::{TransportError, TransportErrorKind};
pub use http::HttpTransport;

use crate::session::ConversationId;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Raw response body, chunked as delivered by the network
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Outbound calls to the chat service
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a user message. A non-success status is an error before any
    /// body bytes are handed out.
    async fn post_message(
        &self,
        text: &str,
        conversation_id: &ConversationId,
    ) -> Result<ByteStream, TransportError>;

    /// Ask the server to forget the conversation history
    async fn post_reset(&self, conversation_id: &ConversationId) -> Result<(), TransportError>;

    /// Check the service is reachable
    async fn health(&self) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn post_message(
        &self,
        text: &str,
        conversation_id: &ConversationId,
    ) -> Result<ByteStream, TransportError> {
        (**self).post_message(text, conversation_id).await
    }

    async fn post_reset(&self, conversation_id: &ConversationId) -> Result<(), TransportError> {
        (**self).post_reset(conversation_id).await
    }

    async fn health(&self) -> Result<(), TransportError> {
        (**self).health().await
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T: ChatTransport> LoggingTransport<T> {
    #[must_use]
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: ChatTransport> ChatTransport for LoggingTransport<T> {
    async fn post_message(
        &self,
        text: &str,
        conversation_id: &ConversationId,
    ) -> Result<ByteStream, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.post_message(text, conversation_id).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => tracing::info!(
                conv_id = %conversation_id,
                duration_ms = %duration.as_millis(),
                chars = text.chars().count(),
                "Chat stream opened"
            ),
            Err(e) => tracing::error!(
                conv_id = %conversation_id,
                duration_ms = %duration.as_millis(),
                kind = ?e.kind,
                error = %e.message,
                "Chat request failed"
            ),
        }

        result
    }

    async fn post_reset(&self, conversation_id: &ConversationId) -> Result<(), TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.post_reset(conversation_id).await;
        let duration = start.elapsed();

        match &result {
            Ok(()) => tracing::info!(
                conv_id = %conversation_id,
                duration_ms = %duration.as_millis(),
                "Conversation reset on server"
            ),
            Err(e) => tracing::warn!(
                conv_id = %conversation_id,
                duration_ms = %duration.as_millis(),
                kind = ?e.kind,
                error = %e.message,
                "Reset request failed"
            ),
        }

        result
    }

    async fn health(&self) -> Result<(), TransportError> {
        self.inner.health().await
    }
}
