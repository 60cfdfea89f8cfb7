use agents_api::{AgentSummary, RunOrchestrator};
use async_trait::async_trait;

use crate::provider::{
    BackendProfile, CancelSignal, ChatBackend, TurnFailure, TurnReply, TurnRequest,
};

use super::AGENTS_BACKEND_ID;

/// Backend that runs turns against the hosted agents API.
#[derive(Debug, Clone)]
pub struct AgentsBackend {
    orchestrator: RunOrchestrator,
}

impl AgentsBackend {
    pub fn new(orchestrator: RunOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &RunOrchestrator {
        &self.orchestrator
    }
}

#[async_trait]
impl ChatBackend for AgentsBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile {
            backend_id: AGENTS_BACKEND_ID.to_string(),
            agent_id: self.orchestrator.agent_id().to_string(),
        }
    }

    async fn agent_profile(&self, cancel: CancelSignal) -> Result<AgentSummary, String> {
        self.orchestrator
            .health_check(Some(&cancel))
            .await
            .map_err(|error| error.to_string())
    }

    async fn list_agents(&self, cancel: CancelSignal) -> Result<Vec<AgentSummary>, String> {
        self.orchestrator
            .client()
            .list_agents(Some(&cancel))
            .await
            .map_err(|error| error.to_string())
    }

    async fn send_turn(
        &self,
        request: TurnRequest,
        cancel: CancelSignal,
    ) -> Result<TurnReply, TurnFailure> {
        self.orchestrator
            .send_turn(
                request.thread_id.as_deref(),
                &request.text,
                &request.attachments,
                Some(&cancel),
            )
            .await
            .map_err(|failure| {
                tracing::warn!(thread_id = ?failure.thread_id, error = %failure.error, "turn failed");
                TurnFailure::new(failure.thread_id, failure.error.to_string())
            })
    }
}
