//! Transcript state for one conversation.
//!
//! The transcript is append-only: a message is never edited after it is
//! pushed. User messages are appended in send order, assistant messages in
//! arrival order, and a failed turn still appends an assistant message that
//! carries the error text.

use agents_api::Attachment;
use thiserror::Error;
use time::OffsetDateTime;

use crate::provider::{TurnFailure, TurnReply, TurnRequest};

pub const ERROR_REPLY_PREFIX: &str = "Sorry, an error occurred: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Server message id for assistant replies, otherwise a local UUID.
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: OffsetDateTime,
    pub attachments: Vec<Attachment>,
}

impl ChatMessage {
    fn local(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: OffsetDateTime::now_utc(),
            attachments: Vec::new(),
        }
    }
}

/// Why a turn could not start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnRejected {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Run already active")]
    RunAlreadyActive,
}

pub fn welcome_text(agent_name: &str) -> String {
    format!("Hello! I'm {agent_name}. How can I help you today?")
}

pub fn new_conversation_text(agent_name: &str) -> String {
    format!("Hello! I'm {agent_name}. Started a new conversation. How can I help you today?")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    agent_name: String,
    thread_id: Option<String>,
    mode: Mode,
    transcript: Vec<ChatMessage>,
    pending_attachments: Vec<Attachment>,
}

impl Conversation {
    /// Starts a conversation whose transcript holds only the welcome message.
    pub fn new(agent_name: impl Into<String>) -> Self {
        let agent_name = agent_name.into();
        let welcome = ChatMessage::local(Role::Assistant, welcome_text(&agent_name));
        Self {
            agent_name,
            thread_id: None,
            mode: Mode::Idle,
            transcript: vec![welcome],
            pending_attachments: Vec::new(),
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.mode == Mode::Running
    }

    pub fn pending_attachments(&self) -> &[Attachment] {
        &self.pending_attachments
    }

    /// Queues an already validated attachment for the next turn.
    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.pending_attachments.push(attachment);
    }

    /// Drops a pending attachment by id or by unique id prefix.
    pub fn remove_attachment(&mut self, id: &str) -> Option<Attachment> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }

        let position = match self
            .pending_attachments
            .iter()
            .position(|attachment| attachment.id == id)
        {
            Some(position) => position,
            None => {
                let mut matches = self
                    .pending_attachments
                    .iter()
                    .enumerate()
                    .filter(|(_, attachment)| attachment.id.starts_with(id));
                match (matches.next(), matches.next()) {
                    (Some((position, _)), None) => position,
                    _ => return None,
                }
            }
        };

        Some(self.pending_attachments.remove(position))
    }

    /// Appends the user message and enters [`Mode::Running`].
    ///
    /// Pending attachments move into the message and the returned request.
    pub fn begin_turn(&mut self, text: &str) -> Result<TurnRequest, TurnRejected> {
        if self.is_running() {
            return Err(TurnRejected::RunAlreadyActive);
        }
        if text.trim().is_empty() {
            return Err(TurnRejected::EmptyMessage);
        }

        let attachments = std::mem::take(&mut self.pending_attachments);
        let mut message = ChatMessage::local(Role::User, text);
        message.attachments = attachments.clone();
        self.transcript.push(message);
        self.mode = Mode::Running;

        Ok(TurnRequest {
            thread_id: self.thread_id.clone(),
            text: text.to_string(),
            attachments,
        })
    }

    /// Appends the assistant reply and remembers its thread for the next turn.
    pub fn complete_turn(&mut self, reply: TurnReply) {
        let timestamp = reply
            .created_at
            .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
            .unwrap_or_else(OffsetDateTime::now_utc);

        self.thread_id = Some(reply.thread_id);
        self.transcript.push(ChatMessage {
            id: reply
                .message_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            role: Role::Assistant,
            content: reply.content,
            timestamp,
            attachments: Vec::new(),
        });
        self.mode = Mode::Idle;
    }

    /// Appends a synthetic assistant message carrying the failure text.
    ///
    /// A thread the failed run created is kept so the next turn continues it.
    pub fn fail_turn(&mut self, failure: &TurnFailure) {
        if let Some(thread_id) = &failure.thread_id {
            self.thread_id = Some(thread_id.clone());
        }
        self.transcript.push(ChatMessage::local(
            Role::Assistant,
            format!("{ERROR_REPLY_PREFIX}{}", failure.message),
        ));
        self.mode = Mode::Idle;
    }

    /// Forgets the server thread and restarts the transcript with a greeting.
    ///
    /// The server-side thread is left alone.
    pub fn new_conversation(&mut self) -> Result<(), TurnRejected> {
        if self.is_running() {
            return Err(TurnRejected::RunAlreadyActive);
        }

        self.thread_id = None;
        self.pending_attachments.clear();
        self.transcript = vec![ChatMessage::local(
            Role::Assistant,
            new_conversation_text(&self.agent_name),
        )];
        Ok(())
    }
}
