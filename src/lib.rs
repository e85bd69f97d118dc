//! Chatline - streaming chat client core
//!
//! Keeps a conversation with a remote chat service: posts user messages,
//! decodes the server-sent reply stream fragment by fragment, and publishes
//! snapshots of the message log for a shell to render.

pub mod config;
pub mod runtime;
pub mod session;
pub mod state_machine;
pub mod stream;
pub mod transport;
