//! Request bodies sent to the chat service

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub conversation_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResetRequest<'a> {
    pub conversation_id: &'a str,
}
