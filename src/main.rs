//! Chatline - terminal shell for the streaming chat client
//!
//! Reads one message per line from stdin and prints the assistant's reply as
//! it streams in. `/reset` starts over, `/quit` exits.

use chatline::config::ClientConfig;
use chatline::runtime::{start_conversation, ConversationHandle, RuntimeError, Snapshot};
use chatline::session::ConversationId;
use chatline::state_machine::{ConvContext, Sender, TransitionError};
use chatline::transport::{ChatTransport, HttpTransport, LoggingTransport};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the reply text
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatline=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(base_url = %config.base_url, "Using chat service");

    let transport = LoggingTransport::new(HttpTransport::new(&config)?);
    if let Err(e) = transport.health().await {
        tracing::warn!(error = %e, "Chat service is not reachable yet");
    }

    let context = ConvContext::from_config(ConversationId::generate(), &config);
    let handle = start_conversation(transport, context);
    tracing::info!(conv_id = %handle.conversation_id(), "Conversation started");

    let mut stdout = tokio::io::stdout();
    let mut snapshots = handle.subscribe();
    let mut printer = ReplyPrinter::default();

    let greeting = snapshots.borrow_and_update().clone();
    print_greeting(&mut stdout, &greeting).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "/quit" => break,
                    "/reset" => {
                        reset(&handle, &mut printer).await?;
                        let snapshot = snapshots.borrow_and_update().clone();
                        print_greeting(&mut stdout, &snapshot).await?;
                    }
                    _ => match handle.send(line).await {
                        Ok(()) => {
                            let snapshot = snapshots.borrow_and_update().clone();
                            printer.start(&snapshot);
                            printer.render(&mut stdout, &snapshot).await?;
                        }
                        Err(RuntimeError::Rejected(TransitionError::EmptyMessage)) => {}
                        Err(RuntimeError::Rejected(TransitionError::Busy)) => {
                            write_line(&mut stdout, "(still answering, please wait)").await?;
                        }
                        Err(e) => return Err(e.into()),
                    },
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                printer.render(&mut stdout, &snapshot).await?;
            }
        }
    }

    Ok(())
}

async fn reset(handle: &ConversationHandle, printer: &mut ReplyPrinter) -> Result<(), RuntimeError> {
    printer.abandon();
    handle.reset().await
}

async fn print_greeting(stdout: &mut Stdout, snapshot: &Snapshot) -> std::io::Result<()> {
    if let Some(greeting) = snapshot.last() {
        write_line(stdout, &format!("assistant> {}", greeting.text)).await?;
    }
    Ok(())
}

async fn write_line(stdout: &mut Stdout, line: &str) -> std::io::Result<()> {
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

/// Prints the reply in flight as its text grows
#[derive(Debug, Default)]
struct ReplyPrinter {
    /// Log index of the reply being printed
    index: Option<usize>,
    /// Its text already on screen
    shown: String,
}

impl ReplyPrinter {
    /// Follow the reply that a just-accepted send appended
    fn start(&mut self, snapshot: &Snapshot) {
        self.index = snapshot.messages.len().checked_sub(1);
        self.shown.clear();
    }

    fn abandon(&mut self) {
        self.index = None;
        self.shown.clear();
    }

    async fn render(&mut self, stdout: &mut Stdout, snapshot: &Snapshot) -> std::io::Result<()> {
        let Some(index) = self.index else {
            return Ok(());
        };
        // The log was replaced underneath us
        let Some(reply) = snapshot.messages.get(index).filter(|m| m.sender == Sender::Assistant)
        else {
            self.abandon();
            return Ok(());
        };

        if let Some(delta) = reply.text.strip_prefix(self.shown.as_str()) {
            if self.shown.is_empty() && !delta.is_empty() {
                stdout.write_all(b"assistant> ").await?;
            }
            stdout.write_all(delta.as_bytes()).await?;
        } else {
            // Failed replies have their partial text swapped for an apology
            stdout.write_all(b"\nassistant> ").await?;
            stdout.write_all(reply.text.as_bytes()).await?;
        }
        self.shown.clone_from(&reply.text);

        if !reply.pending {
            stdout.write_all(b"\n").await?;
            self.abandon();
        }
        stdout.flush().await
    }
}
