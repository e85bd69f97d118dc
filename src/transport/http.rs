//! HTTP transport backed by reqwest

use super::wire::{ChatRequest, ResetRequest};
use super::{ByteStream, ChatTransport, TransportError};
use crate::config::ClientConfig;
use crate::session::ConversationId;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;

/// Talks to the chat service over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built (TLS backend setup).
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        // No whole-request timeout on the client: it would cut off long
        // replies mid-stream.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::unexpected(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            request_timeout: config.request_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post_message(
        &self,
        text: &str,
        conversation_id: &ConversationId,
    ) -> Result<ByteStream, TransportError> {
        let response = self
            .client
            .post(self.endpoint("chat"))
            .json(&ChatRequest {
                message: text,
                conversation_id: conversation_id.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::from_status(status));
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(TransportError::from)),
        ))
    }

    async fn post_reset(&self, conversation_id: &ConversationId) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.endpoint("reset"))
            .timeout(self.request_timeout)
            .json(&ResetRequest {
                conversation_id: conversation_id.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::from_status(status))
        }
    }

    async fn health(&self) -> Result<(), TransportError> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::from_status(status))
        }
    }
}
