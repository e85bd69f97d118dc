//! Frame decoder: byte chunks in, stream events out

use super::frame::{parse_frame, StreamEvent, FRAME_DELIMITER};
use super::utf8::Utf8Accumulator;
use crate::transport::{ByteStream, TransportError};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;

/// Stream of decoded events for a single response body
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, TransportError>> + Send>>;

/// Incremental decoder for one response body.
///
/// Chunks may split anywhere: inside a UTF-8 character, inside the frame
/// delimiter or inside the JSON payload. Once `Done` has been produced the
/// decoder ignores further input.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    text: Utf8Accumulator,
    buffer: String,
    /// Byte offset in `buffer` before which no delimiter starts
    scanned: usize,
    done: bool,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one chunk, returning every event completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        let decoded = self.text.decode(chunk);
        // CR never appears unescaped inside a JSON payload, so dropping it
        // turns CRLF framing into plain LF framing.
        self.buffer.extend(decoded.chars().filter(|c| *c != '\r'));
        self.drain_frames()
    }

    /// Signal end of input. An unterminated trailing frame is decoded as a
    /// final frame.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        self.done = true;

        let held = self.text.pending_len();
        if held > 0 {
            tracing::warn!(bytes = held, "Dropping incomplete UTF-8 sequence at end of stream");
        }

        self.scanned = 0;
        let rest = std::mem::take(&mut self.buffer);
        parse_frame(rest.trim()).into_iter().collect()
    }

    fn drain_frames(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(end) = self.find_delimiter() {
            let frame: String = self.buffer.drain(..end + FRAME_DELIMITER.len()).collect();
            self.scanned = 0;
            let Some(event) = parse_frame(&frame) else {
                continue;
            };
            let done = event == StreamEvent::Done;
            events.push(event);
            if done {
                self.done = true;
                self.buffer.clear();
                return events;
            }
        }
        // The last byte may still be the first half of a delimiter
        self.scanned = self
            .buffer
            .len()
            .saturating_sub(FRAME_DELIMITER.len() - 1);
        events
    }

    /// Byte offset of the next delimiter, looking only past `scanned`
    fn find_delimiter(&self) -> Option<usize> {
        let delimiter = FRAME_DELIMITER.as_bytes();
        self.buffer
            .as_bytes()
            .get(self.scanned..)?
            .windows(delimiter.len())
            .position(|window| window == delimiter)
            .map(|offset| self.scanned + offset)
    }
}

struct DecodeState {
    bytes: ByteStream,
    decoder: FrameDecoder,
    ready: VecDeque<StreamEvent>,
    finished: bool,
}

/// Decode a response body lazily.
///
/// Yields events in arrival order and ends after `Done` or when the body
/// ends. A read error is yielded once and ends the stream.
#[must_use]
pub fn decode_stream(bytes: ByteStream) -> EventStream {
    let state = DecodeState {
        bytes,
        decoder: FrameDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    let events = stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.ready.pop_front() {
                return Some((Ok(event), st));
            }
            if st.finished || st.decoder.is_done() {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let decoded = st.decoder.push(&chunk);
                    st.ready.extend(decoded);
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.finished = true;
                    let decoded = st.decoder.finish();
                    st.ready.extend(decoded);
                }
            }
        }
    });

    Box::pin(events)
}
