//! Event frames and their payloads

use serde::Deserialize;

/// Prefix marking a frame that carries an event payload
pub const DATA_PREFIX: &str = "data:";

/// Separates two frames on the wire
pub const FRAME_DELIMITER: &str = "\n\n";

/// Decoded server event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of the assistant reply (may be empty)
    Content { text: String },
    /// The server finished the reply
    Done,
    /// The server reported a failure while producing the reply
    ServerError { message: String },
    /// A frame whose payload could not be parsed; never fatal
    MalformedFragment { payload: String },
}

impl StreamEvent {
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        StreamEvent::Content { text: text.into() }
    }

    /// Events after which the server sends nothing meaningful
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::ServerError { .. })
    }
}

/// Wire payload of a `data:` frame
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FramePayload {
    Content {
        content: String,
    },
    Done,
    Error {
        #[serde(default)]
        content: String,
    },
}

/// Parse one complete frame (delimiter already removed).
///
/// Returns `None` for frames that carry no event: blank frames, `:` comments
/// and frames without the `data:` prefix.
#[must_use]
pub fn parse_frame(frame: &str) -> Option<StreamEvent> {
    let frame = frame.trim_matches('\n');
    if frame.is_empty() || frame.starts_with(':') {
        return None;
    }

    let Some(payload) = frame.strip_prefix(DATA_PREFIX) else {
        tracing::debug!(frame = %frame, "Skipping non-data frame");
        return None;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    match serde_json::from_str::<FramePayload>(payload) {
        Ok(FramePayload::Content { content }) => Some(StreamEvent::Content { text: content }),
        Ok(FramePayload::Done) => Some(StreamEvent::Done),
        Ok(FramePayload::Error { content }) => Some(StreamEvent::ServerError { message: content }),
        Err(e) => {
            tracing::warn!(error = %e, payload = %payload, "Skipping malformed stream frame");
            Some(StreamEvent::MalformedFragment {
                payload: payload.to_string(),
            })
        }
    }
}
