//! Client primitives for the thread/run-oriented agents API.
//!
//! This crate owns transport, run orchestration and reply extraction for the
//! agents endpoints only. It contains no credential persistence and no UI
//! coupling: callers hand in a [`CredentialProvider`] and get plain results
//! back.
//!
//! Layering, leaves first:
//!
//! - [`client::AgentsApiClient`] performs authenticated JSON calls with the
//!   transient-failure retry policy from [`retry`].
//! - [`orchestrator::RunOrchestrator`] creates thread runs and polls them to a
//!   terminal [`RunStatus`].
//! - [`messages`] selects and normalizes the latest assistant reply.
//! - [`attachments`] validates local files and encodes them as inline
//!   data-URI asset references.
//! - [`directory`] lists agents and fetches display metadata.

pub mod attachments;
pub mod client;
pub mod config;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod files;
pub mod headers;
pub mod messages;
pub mod orchestrator;
pub mod payload;
pub mod retry;
pub mod run;
pub mod url;

pub use attachments::{Attachment, AttachmentError, AttachmentTool, AttachmentTools};
pub use client::{AgentsApiClient, CancellationSignal};
pub use config::{AgentsApiConfig, AuthMode, CredentialField, Credentials};
pub use credentials::{
    AgentIdOverride, ChainedCredentials, CredentialProvider, EnvCredentials, FileCredentials,
    StaticCredentials,
};
pub use directory::{get_agent, list_agents, AgentSummary};
pub use error::{AgentsApiError, ConfigError};
pub use files::FileObject;
pub use messages::{ContentBlock, MessageContent, MessageRole, ThreadMessage};
pub use orchestrator::{PollPolicy, RunOrchestrator, TurnError, TurnReply};
pub use payload::RunOptions;
pub use retry::RetryPolicy;
pub use run::{Run, RunStatus};
