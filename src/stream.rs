//! Response stream decoding
//!
//! Turns the raw chat response body into discrete server events. The body is
//! a sequence of `data: <json>` frames separated by blank lines.

mod decoder;
mod frame;
mod utf8;


pub use decoder::{decode_stream, EventStream, FrameDecoder};
pub use frame::{parse_frame, StreamEvent};
pub use utf8::Utf8Accumulator;
