//! One-shot chat run and session listing for the terminal.

use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::args::RunArgs;
use crate::client::ChatClient;
use crate::models::{Conversation, ImageAttachment};
use crate::protocol::ProtocolEvent;
use crate::session::{ChatSession, SendOptions, SendOutcome};
use crate::store::ChatStore;
use crate::traits::HttpClient;

/// Exit code of a run stopped with Ctrl-C.
pub const EXIT_STOPPED: i32 = 130;

/// Send `prompt` in a fresh conversation, streaming the reply to stdout.
///
/// Reasoning and tool activity go to stderr. Ctrl-C stops the run.
pub async fn run_chat<C>(
    client: ChatClient<C>,
    args: &RunArgs,
    prompt: &str,
    attachments: Vec<ImageAttachment>,
) -> SendOutcome
where
    C: HttpClient,
{
    let store = Arc::new(ChatStore::new());
    let (tx, rx) = mpsc::unbounded_channel();
    let session = ChatSession::new(client, Arc::clone(&store)).with_event_sink(tx);
    let conversation_id = session.create_conversation();

    let printer = tokio::spawn(print_events(rx));

    let interrupt = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupted, stopping run");
                store.abort_streaming_request();
            }
        })
    };

    let options = SendOptions {
        model: args.model.clone(),
        thinking: args.thinking,
        attachments,
    };
    let outcome = session
        .send_message(&conversation_id, prompt, options)
        .await;

    interrupt.abort();
    // Closing the sink lets the printer drain and finish.
    drop(session);
    if let Err(e) = printer.await {
        warn!("Printer task failed: {}", e);
    }

    outcome
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<ProtocolEvent>) {
    let mut printer = EventPrinter::default();
    let stdout = io::stdout();
    let stderr = io::stderr();
    while let Some(event) = rx.recv().await {
        let result = printer.render(&event, &mut stdout.lock(), &mut stderr.lock());
        if let Err(e) = result {
            warn!("Failed to write output: {}", e);
            break;
        }
    }
    let _ = printer.finish(&mut stdout.lock());
}

/// Renders protocol events as plain terminal text.
#[derive(Debug, Default)]
pub struct EventPrinter {
    in_reasoning: bool,
    wrote_text: bool,
}

impl EventPrinter {
    pub fn render<O, E>(&mut self, event: &ProtocolEvent, out: &mut O, err: &mut E) -> io::Result<()>
    where
        O: Write,
        E: Write,
    {
        match event {
            ProtocolEvent::TextMessageReasoningDelta { delta, .. } => {
                if !self.in_reasoning {
                    write!(err, "[thinking] ")?;
                    self.in_reasoning = true;
                }
                write!(err, "{}", delta)?;
                err.flush()?;
            }
            ProtocolEvent::TextMessageReasoningEnd { .. } => self.end_reasoning(err)?,
            ProtocolEvent::TextMessageDelta { delta, .. } => {
                self.end_reasoning(err)?;
                write!(out, "{}", delta)?;
                out.flush()?;
                self.wrote_text = true;
            }
            ProtocolEvent::ToolCallStart {
                tool_call_id,
                tool_call_name,
                ..
            } => {
                self.end_reasoning(err)?;
                writeln!(
                    err,
                    "[tool] {} ({})",
                    tool_call_name.as_deref().unwrap_or("tool_call"),
                    tool_call_id
                )?;
            }
            ProtocolEvent::RunError { message, code } => {
                self.end_reasoning(err)?;
                match code {
                    Some(code) => writeln!(err, "[error {}] {}", code, message)?,
                    None => writeln!(err, "[error] {}", message)?,
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Terminate the reply line, if one was started.
    pub fn finish<O: Write>(&mut self, out: &mut O) -> io::Result<()> {
        if self.wrote_text {
            writeln!(out)?;
            self.wrote_text = false;
        }
        out.flush()
    }

    fn end_reasoning<E: Write>(&mut self, err: &mut E) -> io::Result<()> {
        if self.in_reasoning {
            writeln!(err)?;
            self.in_reasoning = false;
        }
        Ok(())
    }
}

/// Print the server's conversations, newest first.
pub async fn list_sessions<C: HttpClient>(client: ChatClient<C>) -> crate::error::ApiResult<()> {
    let session = ChatSession::new(client, Arc::new(ChatStore::new()));
    session.load_sessions().await?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for conversation in session.store().conversations() {
        if let Err(e) = writeln!(out, "{}", format_conversation(&conversation)) {
            warn!("Failed to write output: {}", e);
            break;
        }
    }
    Ok(())
}

/// `<id>  <updated>  <title>`
pub fn format_conversation(conversation: &Conversation) -> String {
    let updated = chrono::DateTime::from_timestamp_millis(conversation.updated_at)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{}  {}  {}", conversation.id, updated, conversation.title)
}
