use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::attachments::AttachmentError;
use crate::config::CredentialField;
use crate::run::RunStatus;

/// Configuration problems detected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("incomplete agent configuration, missing: {}", join_fields(.0))]
    MissingFields(Vec<CredentialField>),

    #[error("invalid endpoint URL {0}")]
    InvalidEndpoint(String),

    #[error("environment variable {name} is not valid unicode")]
    InvalidEnvVar { name: String },

    #[error("failed to read credentials file {path}: {message}")]
    File { path: String, message: String },

    #[error("no credential source configured")]
    NoSource,
}

impl ConfigError {
    /// Blank credential fields, when this is a missing-field error.
    pub fn missing_fields(&self) -> &[CredentialField] {
        match self {
            Self::MissingFields(fields) => fields,
            _ => &[],
        }
    }
}

fn join_fields(fields: &[CredentialField]) -> String {
    fields
        .iter()
        .map(|field| field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum AgentsApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid header {0}")]
    InvalidHeader(String),

    #[error("invalid request payload: {0}")]
    InvalidPayload(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Run failed: {message}")]
    RunFailed { run_id: String, message: String },

    #[error("Run ended with status: {status}")]
    RunEnded { run_id: String, status: RunStatus },

    #[error("Thread run timed out after {}s", .waited.as_secs())]
    Timeout { waited: Duration },

    #[error("request was cancelled")]
    Cancelled,

    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    #[error("no assistant reply found in thread {thread_id}")]
    NoAssistantReply { thread_id: String },
}

impl AgentsApiError {
    /// HTTP status attached to this error, when the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(error) => error.status(),
            _ => None,
        }
    }

    /// True for failures worth another poll: transport errors, retryable
    /// statuses that exhausted their retries, and server-side 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status, .. } => {
                crate::retry::is_retryable_status(status.as_u16()) || status.is_server_error()
            }
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorPayloadFields>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayloadFields {
    message: Option<String>,
}

/// Human-readable message for a failed response.
///
/// Looks for `{error: {message}}`, then `{message}`, then falls back to the raw
/// body and finally to the status text.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        let nested = payload.error.and_then(|error| error.message);
        if let Some(message) = nested.or(payload.message).and_then(non_empty) {
            return message;
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('{') {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
