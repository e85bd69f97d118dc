//! Conversation runtime executor

use super::{Command, Snapshot};
use crate::session::ConversationId;
use crate::state_machine::{
    transition, ConvContext, ConvState, Effect, Event, ExchangeId, Message, MessageLog,
    TransitionError,
};
use crate::stream::decode_stream;
use crate::transport::ChatTransport;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Owns one conversation: its state, its log and the reply stream in flight
pub struct ConversationRuntime<T>
where
    T: ChatTransport + 'static,
{
    context: ConvContext,
    state: ConvState,
    log: MessageLog,
    transport: Arc<T>,
    command_rx: mpsc::Receiver<Command>,
    /// Events produced by reply-stream tasks
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    snapshot_tx: watch::Sender<Snapshot>,
    /// Token to stop the reply stream in flight
    stream_cancel: Option<CancellationToken>,
    last_exchange: ExchangeId,
}

impl<T> ConversationRuntime<T>
where
    T: ChatTransport + 'static,
{
    #[must_use]
    pub fn new(context: ConvContext, transport: T, command_rx: mpsc::Receiver<Command>) -> Self {
        let log = MessageLog::new(Message::assistant(context.greeting.clone()));
        let state = ConvState::Idle;
        let (event_tx, event_rx) = mpsc::channel(64);
        let (snapshot_tx, _) = watch::channel(Snapshot {
            conversation_id: context.conversation_id.clone(),
            state,
            messages: log.messages().to_vec(),
        });

        Self {
            context,
            state,
            log,
            transport: Arc::new(transport),
            command_rx,
            event_rx,
            event_tx,
            snapshot_tx,
            stream_cancel: None,
            last_exchange: ExchangeId::default(),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    pub async fn run(mut self) {
        tracing::info!(conv_id = %self.context.conversation_id, "Starting conversation runtime");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    // Every handle is gone
                    None => break,
                },
                Some(event) = self.event_rx.recv() => {
                    if let Err(e) = self.process_event(event).await {
                        tracing::debug!(
                            conv_id = %self.context.conversation_id,
                            reason = %e,
                            "Dropping stream event"
                        );
                    }
                }
            }
        }

        if let Some(token) = self.stream_cancel.take() {
            token.cancel();
        }
        tracing::info!(conv_id = %self.context.conversation_id, "Conversation runtime stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send { text, reply } => {
                let exchange = self.last_exchange.next();
                let result = self.process_event(Event::UserMessage { text, exchange }).await;
                match &result {
                    Ok(()) => self.last_exchange = exchange,
                    Err(e) => tracing::info!(
                        conv_id = %self.context.conversation_id,
                        reason = %e,
                        "Send refused"
                    ),
                }
                let _ = reply.send(result);
            }
            Command::Reset { reply } => {
                if let Err(e) = self.process_event(Event::Reset).await {
                    tracing::error!(error = %e, "Reset refused");
                }
                let _ = reply.send(());
            }
        }
    }

    async fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        // Pure state transition
        let result = transition(&self.state, &self.context, event)?;

        let old_state = std::mem::replace(&mut self.state, result.new_state);
        if old_state != self.state {
            tracing::debug!(
                conv_id = %self.context.conversation_id,
                from = ?old_state,
                to = ?self.state,
                "State transition"
            );
        }

        for effect in result.effects {
            self.execute_effect(effect).await;
        }

        self.publish();
        Ok(())
    }

    /// Execute an effect
    async fn execute_effect(&mut self, effect: Effect) {
        let applied = match effect {
            Effect::AppendMessage { message } => self.log.append(message),
            Effect::AppendToPending { text } => self.log.append_to_pending(&text),
            Effect::FinishPending => self.log.finish_pending(),
            Effect::FailPending { text } => self.log.fail_pending(text),
            Effect::ReplaceLog { greeting } => {
                self.log.replace(greeting);
                Ok(())
            }

            Effect::PostMessage { text, exchange } => {
                self.start_exchange(text, exchange);
                Ok(())
            }

            Effect::PostReset => {
                // The log is about to be cleared, so a failure is only logged
                if let Err(e) = self.transport.post_reset(&self.context.conversation_id).await {
                    tracing::warn!(
                        conv_id = %self.context.conversation_id,
                        error = %e,
                        "Server-side reset failed"
                    );
                }
                Ok(())
            }

            Effect::AbortStream => {
                if let Some(token) = self.stream_cancel.take() {
                    token.cancel();
                }
                Ok(())
            }
        };

        if let Err(e) = applied {
            tracing::error!(
                conv_id = %self.context.conversation_id,
                error = %e,
                "Message log rejected update"
            );
        }
    }

    fn start_exchange(&mut self, text: String, exchange: ExchangeId) {
        let cancel = CancellationToken::new();
        if let Some(previous) = self.stream_cancel.replace(cancel.clone()) {
            previous.cancel();
        }

        tokio::spawn(pump_exchange(
            self.transport.clone(),
            self.context.conversation_id.clone(),
            text,
            exchange,
            self.event_tx.clone(),
            cancel,
        ));
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(Snapshot {
            conversation_id: self.context.conversation_id.clone(),
            state: self.state,
            messages: self.log.messages().to_vec(),
        });
    }
}

/// Post one message and feed its reply back to the runtime as events.
///
/// Stops at the first terminal event, at end of body, or when cancelled;
/// dropping the body closes the connection.
async fn pump_exchange<T: ChatTransport>(
    transport: Arc<T>,
    conversation_id: ConversationId,
    text: String,
    exchange: ExchangeId,
    events: mpsc::Sender<Event>,
    cancel: CancellationToken,
) {
    let opened = tokio::select! {
        biased;

        () = cancel.cancelled() => {
            tracing::debug!(exchange = %exchange, "Exchange abandoned before the reply started");
            return;
        }
        result = transport.post_message(&text, &conversation_id) => result,
    };

    let body = match opened {
        Ok(body) => body,
        Err(error) => {
            let _ = events.send(Event::TransportFailed { exchange, error }).await;
            return;
        }
    };

    let mut stream = decode_stream(body);
    loop {
        let next = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::debug!(exchange = %exchange, "Exchange abandoned mid-reply");
                return;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(event)) => {
                let terminal = event.is_terminal();
                if events.send(Event::Stream { exchange, event }).await.is_err() || terminal {
                    return;
                }
            }
            Some(Err(error)) => {
                let _ = events.send(Event::TransportFailed { exchange, error }).await;
                return;
            }
            None => {
                let _ = events.send(Event::StreamEnded { exchange }).await;
                return;
            }
        }
    }
}
