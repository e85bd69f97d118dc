//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod message;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use message::{LogError, Message, MessageLog, Sender};
pub use state::{ConvContext, ConvState, ExchangeId};
pub use transition::{apology_for, transition, TransitionError, TransitionResult};
