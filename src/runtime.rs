//! Runtime for executing conversations
//!
//! A conversation runs as a single task that owns its state and message log.
//! Shells talk to it through a `ConversationHandle`: user intents go in over
//! a command channel, snapshots come out over a watch channel.

mod executor;


pub use executor::ConversationRuntime;

use crate::session::ConversationId;
use crate::state_machine::{ConvContext, ConvState, Message, TransitionError};
use crate::transport::ChatTransport;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

/// Point-in-time view of a conversation, published after every transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub conversation_id: ConversationId,
    pub state: ConvState,
    pub messages: Vec<Message>,
}

impl Snapshot {
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// User intents forwarded to the runtime
#[derive(Debug)]
pub enum Command {
    Send {
        text: String,
        reply: oneshot::Sender<Result<(), TransitionError>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("Conversation runtime has stopped")]
    Stopped,
}

/// Handle to interact with a running conversation
#[derive(Debug, Clone)]
pub struct ConversationHandle {
    conversation_id: ConversationId,
    command_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<Snapshot>,
}

impl ConversationHandle {
    #[must_use]
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Submit user text. Blank text, or text sent while a reply is still in
    /// flight, is refused and leaves the conversation untouched.
    ///
    /// # Errors
    ///
    /// `RuntimeError::Rejected` when the message is refused,
    /// `RuntimeError::Stopped` when the runtime is gone.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), RuntimeError> {
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(Command::Send {
                text: text.into(),
                reply,
            })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        response.await.map_err(|_| RuntimeError::Stopped)??;
        Ok(())
    }

    /// Reset the conversation. Resolves once the log holds only the reset
    /// greeting, whether or not the server call succeeded.
    ///
    /// # Errors
    ///
    /// `RuntimeError::Stopped` when the runtime is gone.
    pub async fn reset(&self) -> Result<(), RuntimeError> {
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(Command::Reset { reply })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        response.await.map_err(|_| RuntimeError::Stopped)
    }

    /// Latest published snapshot
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }

    /// Wait until no reply is in flight and return that snapshot
    ///
    /// # Errors
    ///
    /// `RuntimeError::Stopped` when the runtime exits first.
    pub async fn wait_until_idle(&self) -> Result<Snapshot, RuntimeError> {
        let mut rx = self.subscribe();
        let snapshot = rx
            .wait_for(|s| !s.is_busy())
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        Ok(snapshot.clone())
    }
}

/// Start a conversation runtime on the current tokio runtime
#[must_use]
pub fn start_conversation<T>(transport: T, context: ConvContext) -> ConversationHandle
where
    T: ChatTransport + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(32);
    let conversation_id = context.conversation_id.clone();

    let runtime = ConversationRuntime::new(context, transport, command_rx);
    let snapshot_rx = runtime.subscribe();

    tokio::spawn(runtime.run());

    ConversationHandle {
        conversation_id,
        command_tx,
        snapshot_rx,
    }
}
