//! Thread/run orchestration.
//!
//! One [`RunOrchestrator`] serves every credential source: the bundle comes in
//! through a [`CredentialProvider`], never from a hard-wired config object.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;

use crate::attachments::{encode_attachments, Attachment, AttachmentTools};
use crate::client::{await_or_cancel, AgentsApiClient, CancellationSignal};
use crate::config::{AgentsApiConfig, AuthMode};
use crate::credentials::CredentialProvider;
use crate::directory::AgentSummary;
use crate::error::AgentsApiError;
use crate::messages::{latest_assistant_message, ThreadMessage};
use crate::payload::{
    CreateRunRequest, CreateThreadAndRunRequest, ListEnvelope, RunOptions, ThreadMessageOption,
};
use crate::run::{Run, RunStatus, RunUsage};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(300_000);
pub const DEFAULT_MAX_CONSECUTIVE_POLL_FAILURES: u32 = 3;

/// Failure text used when a failed run carries no server message.
pub const UNKNOWN_RUN_ERROR: &str = "Unknown error";

/// How `wait_for_run_completion` polls a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
    /// Consecutive transient GET failures that end the wait; a success resets the count.
    pub max_consecutive_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_POLL_FAILURES,
        }
    }
}

/// Outcome of one successful turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReply {
    pub thread_id: String,
    pub run_id: String,
    pub message_id: Option<String>,
    /// Normalized assistant text.
    pub content: String,
    pub created_at: Option<i64>,
    pub usage: Option<RunUsage>,
}

/// A failed turn, with the thread it ran on when the server got that far.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct TurnError {
    pub thread_id: Option<String>,
    #[source]
    pub error: AgentsApiError,
}

#[derive(Debug, Clone)]
pub struct RunOrchestrator {
    client: Arc<AgentsApiClient>,
    poll: PollPolicy,
    options: RunOptions,
    tools: AttachmentTools,
}

impl RunOrchestrator {
    pub fn new(client: Arc<AgentsApiClient>) -> Self {
        Self {
            client,
            poll: PollPolicy::default(),
            options: RunOptions::default(),
            tools: AttachmentTools::default(),
        }
    }

    /// Builds a client from whatever bundle `provider` yields.
    ///
    /// An explicit `auth_mode` wins over the provider's preference, which wins
    /// over the default bearer mode.
    pub fn from_provider(
        provider: &dyn CredentialProvider,
        auth_mode: Option<AuthMode>,
    ) -> Result<Self, AgentsApiError> {
        let credentials = provider.credentials()?;
        let auth_mode = auth_mode.or_else(|| provider.auth_mode()).unwrap_or_default();
        tracing::debug!(source = provider.source(), ?auth_mode, "loaded agent credentials");
        let config = AgentsApiConfig::new(credentials).with_auth_mode(auth_mode);
        Ok(Self::new(Arc::new(AgentsApiClient::new(config)?)))
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_run_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_attachment_tools(mut self, tools: AttachmentTools) -> Self {
        self.tools = tools;
        self
    }

    pub fn client(&self) -> &Arc<AgentsApiClient> {
        &self.client
    }

    pub fn agent_id(&self) -> &str {
        self.client.agent_id()
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// `POST /threads/runs`: a new thread seeded with one user turn, plus its run.
    pub async fn create_thread_and_run(
        &self,
        message: &str,
        attachments: &[Attachment],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Run, AgentsApiError> {
        let turn = ThreadMessageOption::user(message, encode_attachments(attachments, &self.tools));
        let body = CreateThreadAndRunRequest::new(self.agent_id(), turn, &self.options);
        let run: Run = self
            .client
            .post_json(&["threads", "runs"], &body, cancellation)
            .await?;
        tracing::info!(
            thread_id = %run.thread_id,
            run_id = %run.id,
            status = %run.status,
            attachments = attachments.len(),
            "created thread and run"
        );
        Ok(run)
    }

    /// Follow-up turn on an existing thread: posts the message, then starts a run.
    pub async fn create_run(
        &self,
        thread_id: &str,
        message: &str,
        attachments: &[Attachment],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Run, AgentsApiError> {
        let turn = ThreadMessageOption::user(message, encode_attachments(attachments, &self.tools));
        let _: Value = self
            .client
            .post_json(&["threads", thread_id, "messages"], &turn, cancellation)
            .await?;

        let body = CreateRunRequest::new(self.agent_id(), &self.options);
        let run: Run = self
            .client
            .post_json(&["threads", thread_id, "runs"], &body, cancellation)
            .await?;
        tracing::info!(%thread_id, run_id = %run.id, status = %run.status, "created run");
        Ok(run)
    }

    /// `GET /threads/{thread_id}/runs/{run_id}`.
    pub async fn get_run(
        &self,
        thread_id: &str,
        run_id: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Run, AgentsApiError> {
        self.client
            .get_json(&["threads", thread_id, "runs", run_id], cancellation)
            .await
    }

    /// Polls with the configured [`PollPolicy`] until the run is terminal.
    pub async fn wait_for_run_completion(
        &self,
        thread_id: &str,
        run_id: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Run, AgentsApiError> {
        self.wait_for_run_completion_within(thread_id, run_id, self.poll.max_wait, cancellation)
            .await
    }

    /// Polls every `interval` until the run reaches a terminal status
    /// (`requires_action` included) or `max_wait` elapses.
    ///
    /// The last sleep is clamped to the deadline and followed by one final
    /// poll. Transient GET failures are tolerated up to
    /// `max_consecutive_failures` in a row.
    pub async fn wait_for_run_completion_within(
        &self,
        thread_id: &str,
        run_id: &str,
        max_wait: Duration,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Run, AgentsApiError> {
        let started = Instant::now();
        let mut failures = 0u32;

        loop {
            match self.get_run(thread_id, run_id, cancellation).await {
                Ok(run) => {
                    failures = 0;
                    tracing::debug!(%thread_id, %run_id, status = %run.status, "polled run");
                    if run.status.is_terminal() {
                        tracing::info!(
                            %thread_id,
                            %run_id,
                            status = %run.status,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "run reached terminal status"
                        );
                        return Ok(run);
                    }
                }
                Err(error) if error.is_transient() => {
                    failures += 1;
                    if failures >= self.poll.max_consecutive_failures {
                        return Err(error);
                    }
                    tracing::warn!(%thread_id, %run_id, failures, %error, "run poll failed, will retry");
                }
                Err(error) => return Err(error),
            }

            let elapsed = started.elapsed();
            if elapsed >= max_wait {
                return Err(AgentsApiError::Timeout { waited: elapsed });
            }
            let pause = self.poll.interval.min(max_wait - elapsed);
            await_or_cancel(tokio::time::sleep(pause), cancellation).await?;
        }
    }

    /// `POST /threads/{thread_id}/runs/{run_id}/cancel`.
    pub async fn cancel_run(
        &self,
        thread_id: &str,
        run_id: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Run, AgentsApiError> {
        let run: Run = self
            .client
            .post_json(
                &["threads", thread_id, "runs", run_id, "cancel"],
                &serde_json::json!({}),
                cancellation,
            )
            .await?;
        tracing::info!(%thread_id, %run_id, status = %run.status, "requested run cancellation");
        Ok(run)
    }

    /// `GET /threads/{thread_id}/messages`.
    pub async fn get_thread_messages(
        &self,
        thread_id: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Vec<ThreadMessage>, AgentsApiError> {
        let envelope: ListEnvelope<ThreadMessage> = self
            .client
            .get_json(&["threads", thread_id, "messages"], cancellation)
            .await?;
        Ok(envelope.data)
    }

    /// Newest assistant message on the thread.
    pub async fn latest_reply(
        &self,
        thread_id: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ThreadMessage, AgentsApiError> {
        let messages = self.get_thread_messages(thread_id, cancellation).await?;
        latest_assistant_message(&messages)
            .cloned()
            .ok_or_else(|| AgentsApiError::NoAssistantReply {
                thread_id: thread_id.to_owned(),
            })
    }

    /// One full turn: create (or continue) the thread, wait, extract the reply.
    ///
    /// A cancelled or timed-out wait asks the server to cancel the run before
    /// the error is returned.
    pub async fn send_message(
        &self,
        thread_id: Option<&str>,
        message: &str,
        attachments: &[Attachment],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<TurnReply, AgentsApiError> {
        self.send_turn(thread_id, message, attachments, cancellation)
            .await
            .map_err(|failure| failure.error)
    }

    /// Same as [`send_message`](Self::send_message), but a failure still
    /// reports the thread the turn ran on once the server created it.
    pub async fn send_turn(
        &self,
        thread_id: Option<&str>,
        message: &str,
        attachments: &[Attachment],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<TurnReply, TurnError> {
        let created = match thread_id {
            Some(thread_id) => {
                self.create_run(thread_id, message, attachments, cancellation)
                    .await
            }
            None => {
                self.create_thread_and_run(message, attachments, cancellation)
                    .await
            }
        };
        let run = created.map_err(|error| TurnError {
            thread_id: thread_id.map(str::to_owned),
            error,
        })?;

        self.finish_run(&run, cancellation)
            .await
            .map_err(|error| TurnError {
                thread_id: Some(run.thread_id.clone()),
                error,
            })
    }

    async fn finish_run(
        &self,
        run: &Run,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<TurnReply, AgentsApiError> {
        let finished = match self
            .wait_for_run_completion(&run.thread_id, &run.id, cancellation)
            .await
        {
            Ok(finished) => finished,
            Err(error) => {
                if matches!(error, AgentsApiError::Cancelled | AgentsApiError::Timeout { .. }) {
                    self.cancel_quietly(run).await;
                }
                return Err(error);
            }
        };

        check_completed(&finished)?;

        let reply = self.latest_reply(&finished.thread_id, cancellation).await?;
        Ok(TurnReply {
            thread_id: finished.thread_id,
            run_id: finished.id,
            content: reply.text(),
            message_id: Some(reply.id),
            created_at: Some(reply.created_at),
            usage: finished.usage,
        })
    }

    /// `GET /assistants/{agent_id}`: proves the endpoint, key and agent id line up.
    pub async fn health_check(
        &self,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<AgentSummary, AgentsApiError> {
        self.client.get_agent(self.agent_id(), cancellation).await
    }

    async fn cancel_quietly(&self, run: &Run) {
        if let Err(error) = self.cancel_run(&run.thread_id, &run.id, None).await {
            tracing::debug!(run_id = %run.id, %error, "run cancellation request failed");
        }
    }
}

/// Maps a terminal run to the error its status implies, if any.
fn check_completed(run: &Run) -> Result<(), AgentsApiError> {
    match &run.status {
        RunStatus::Completed => Ok(()),
        RunStatus::Failed => Err(AgentsApiError::RunFailed {
            run_id: run.id.clone(),
            message: run.error_message().unwrap_or(UNKNOWN_RUN_ERROR).to_owned(),
        }),
        status => Err(AgentsApiError::RunEnded {
            run_id: run.id.clone(),
            status: status.clone(),
        }),
    }
}
