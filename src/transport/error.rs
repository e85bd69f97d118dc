//! Transport error types

use thiserror::Error;

/// Transport failure with classification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connection, message)
    }

    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Server { status }, message)
    }

    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unexpected, message)
    }

    /// Build a server error from a non-success HTTP status
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        let message = match status.canonical_reason() {
            Some(reason) => format!("{} {reason}", status.as_u16()),
            None => status.as_u16().to_string(),
        };
        Self::server(status.as_u16(), message)
    }
}

/// Error classification, drives the apology shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Server could not be reached, or the connection dropped mid-body
    Connection,
    /// Server answered with a non-success status
    Server { status: u16 },
    /// Anything else (bad request construction, decode failures, ...)
    Unexpected,
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return Self::from_status(status);
        }
        if error.is_connect() || error.is_timeout() || error.is_body() {
            Self::connection(error.to_string())
        } else {
            Self::unexpected(error.to_string())
        }
    }
}
