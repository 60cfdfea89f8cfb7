//! Backend contract for executing one conversation turn.
//!
//! A backend turns one user message into one assistant reply. It owns no
//! transcript state; [`crate::runner::TurnRunner`] decides what gets appended.

use std::sync::{atomic::AtomicBool, Arc};

use agents_api::{AgentSummary, Attachment};
use async_trait::async_trait;
use thiserror::Error;

pub use agents_api::TurnReply;

/// Shared cancellation flag for one turn.
pub type CancelSignal = Arc<AtomicBool>;

pub fn new_cancel_signal() -> CancelSignal {
    Arc::new(AtomicBool::new(false))
}

/// Input for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    /// Server thread to continue; `None` starts a new one.
    pub thread_id: Option<String>,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// A turn that ended without a reply. `message` is already human-readable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TurnFailure {
    /// Thread the failed run lived on, when the server created one.
    pub thread_id: Option<String>,
    pub message: String,
}

impl TurnFailure {
    pub fn new(thread_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            thread_id,
            message: message.into(),
        }
    }
}

/// Static identity of a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProfile {
    pub backend_id: String,
    pub agent_id: String,
}

#[async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    fn profile(&self) -> BackendProfile;

    /// Display metadata of the configured agent.
    async fn agent_profile(&self, cancel: CancelSignal) -> Result<AgentSummary, String>;

    /// Agents reachable with the current credentials.
    async fn list_agents(&self, cancel: CancelSignal) -> Result<Vec<AgentSummary>, String>;

    /// Runs one turn to completion.
    async fn send_turn(
        &self,
        request: TurnRequest,
        cancel: CancelSignal,
    ) -> Result<TurnReply, TurnFailure>;
}
