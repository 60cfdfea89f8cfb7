//! Line-oriented chat loop.
//!
//! Input is read line by line; while a turn is running the loop keeps reading
//! so `/cancel` can reach the in-flight run. Only new assistant messages are
//! printed, since the user already sees what they typed.

use std::io::{self, Write};
use std::sync::Arc;

use agents_api::attachments::format_file_size;
use agents_api::Attachment;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use crate::conversation::{ChatMessage, Conversation, Role};
use crate::provider::new_cancel_signal;
use crate::runner::{TurnOutcome, TurnRunner};

const PROMPT: &str = "> ";
const SHORT_ID_LEN: usize = 8;

pub struct ChatSession {
    conversation: Conversation,
    runner: Arc<TurnRunner>,
    rendered: usize,
}

impl ChatSession {
    pub fn new(agent_name: impl Into<String>, runner: Arc<TurnRunner>) -> Self {
        Self {
            conversation: Conversation::new(agent_name),
            runner,
            rendered: 0,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Runs until `/quit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        let mut input_closed = false;

        self.render_new_messages(out)?;
        while !input_closed {
            write!(out, "{PROMPT}")?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match parse_slash_command(line) {
                Some(SlashCommand::Quit) => break,
                Some(command) => self.handle_command(command, out).await?,
                None => {
                    input_closed = self.run_turn(line, &mut lines, out).await?;
                }
            }
            self.render_new_messages(out)?;
        }

        Ok(())
    }

    /// Returns true when input reached its end while the turn was running.
    async fn run_turn<R, W>(
        &mut self,
        text: &str,
        lines: &mut Lines<R>,
        out: &mut W,
    ) -> io::Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let runner = Arc::clone(&self.runner);
        let turn = runner.submit(&mut self.conversation, text);
        tokio::pin!(turn);

        let mut input_closed = false;
        let result = loop {
            tokio::select! {
                // Polling the turn first registers it as active before any queued `/cancel`.
                biased;
                result = &mut turn => break result,
                line = lines.next_line(), if !input_closed => match line {
                    Ok(Some(line)) => handle_busy_line(&runner, line.trim(), out)?,
                    Ok(None) => input_closed = true,
                    Err(error) => {
                        tracing::warn!(%error, "stdin read failed during run");
                        input_closed = true;
                    }
                },
            }
        };

        match result {
            Ok(TurnOutcome::Replied { thread_id, run_id }) => {
                tracing::debug!(%thread_id, %run_id, "turn completed");
            }
            Ok(TurnOutcome::Failed { error }) => {
                tracing::debug!(%error, "turn failed");
            }
            Err(rejected) => writeln!(out, "{rejected}")?,
        }

        Ok(input_closed)
    }

    async fn handle_command<W: Write>(
        &mut self,
        command: SlashCommand,
        out: &mut W,
    ) -> io::Result<()> {
        match command {
            SlashCommand::Help => writeln!(out, "{HELP_TEXT}")?,
            SlashCommand::New => match self.conversation.new_conversation() {
                Ok(()) => self.rendered = 0,
                Err(rejected) => writeln!(out, "{rejected}")?,
            },
            SlashCommand::Attach(path) => {
                if path.is_empty() {
                    writeln!(out, "Usage: /attach <path>")?;
                    return Ok(());
                }
                match Attachment::from_path(&path).await {
                    Ok(attachment) => {
                        writeln!(
                            out,
                            "Attached {} ({}) as {}",
                            attachment.name,
                            format_file_size(attachment.size),
                            short_id(&attachment.id)
                        )?;
                        self.conversation.add_attachment(attachment);
                    }
                    Err(error) => writeln!(out, "Cannot attach {path}: {error}")?,
                }
            }
            SlashCommand::Detach(id) => match self.conversation.remove_attachment(&id) {
                Some(attachment) => writeln!(out, "Removed {}", attachment.name)?,
                None => writeln!(out, "No pending attachment matches '{id}'")?,
            },
            SlashCommand::Agents => {
                let current = self.runner.backend().profile().agent_id;
                match self.runner.backend().list_agents(new_cancel_signal()).await {
                    Ok(agents) if agents.is_empty() => writeln!(out, "No agents found")?,
                    Ok(agents) => {
                        for agent in agents {
                            let marker = if agent.id == current { '*' } else { ' ' };
                            writeln!(out, "{marker} {}  {}", agent.id, agent.name)?;
                        }
                    }
                    Err(error) => writeln!(out, "Cannot list agents: {error}")?,
                }
            }
            SlashCommand::Cancel => writeln!(out, "No active run")?,
            SlashCommand::Quit => {}
            SlashCommand::Unknown(name) => {
                writeln!(out, "Unknown command {name}. Type /help for commands.")?
            }
        }

        Ok(())
    }

    fn render_new_messages<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let messages = self.conversation.messages();
        for message in messages.iter().skip(self.rendered) {
            if message.role == Role::Assistant {
                writeln!(out, "{}", format_message(self.conversation.agent_name(), message))?;
            }
        }
        self.rendered = messages.len();
        out.flush()
    }
}

fn handle_busy_line<W: Write>(runner: &TurnRunner, line: &str, out: &mut W) -> io::Result<()> {
    match parse_slash_command(line) {
        Some(SlashCommand::Cancel) => {
            if runner.cancel_active() {
                writeln!(out, "Cancelling...")?;
            }
        }
        _ if line.is_empty() => {}
        _ => writeln!(out, "Run already active")?,
    }
    out.flush()
}

fn format_message(agent_name: &str, message: &ChatMessage) -> String {
    let time = message.timestamp;
    format!(
        "[{:02}:{:02}] {agent_name}: {}",
        time.hour(),
        time.minute(),
        message.content
    )
}

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}
