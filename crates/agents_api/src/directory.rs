//! Stateless agent lookups used by settings and welcome flows.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{AgentsApiClient, CancellationSignal};
use crate::config::{AgentsApiConfig, Credentials};
use crate::error::AgentsApiError;
use crate::payload::ListEnvelope;

/// Directory reads are interactive, so they give up sooner than conversation calls.
pub const DIRECTORY_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Display metadata for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    /// Agent name, or the id when the server has none.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AgentRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    created_at: Option<i64>,
}

impl From<AgentRecord> for AgentSummary {
    fn from(record: AgentRecord) -> Self {
        let name = record
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| record.id.clone());
        Self {
            id: record.id,
            name,
            description: record.description.filter(|value| !value.trim().is_empty()),
            model: record.model,
            created_at: record.created_at,
        }
    }
}

impl AgentsApiClient {
    /// `GET /assistants`.
    pub async fn list_agents(
        &self,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Vec<AgentSummary>, AgentsApiError> {
        let envelope: ListEnvelope<AgentRecord> =
            self.get_json(&["assistants"], cancellation).await?;
        Ok(envelope.data.into_iter().map(AgentSummary::from).collect())
    }

    /// `GET /assistants/{agent_id}`.
    pub async fn get_agent(
        &self,
        agent_id: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<AgentSummary, AgentsApiError> {
        let record: AgentRecord = self
            .get_json(&["assistants", agent_id.trim()], cancellation)
            .await?;
        Ok(record.into())
    }
}

fn directory_client(endpoint: &str, api_key: &str) -> Result<AgentsApiClient, AgentsApiError> {
    let config = AgentsApiConfig::new(Credentials::new(endpoint, api_key, ""))
        .with_timeout(DIRECTORY_REQUEST_TIMEOUT);
    AgentsApiClient::without_agent(config)
}

/// Lists available agents without a full conversation configuration.
pub async fn list_agents(
    endpoint: &str,
    api_key: &str,
) -> Result<Vec<AgentSummary>, AgentsApiError> {
    directory_client(endpoint, api_key)?.list_agents(None).await
}

/// Fetches one agent's display metadata.
pub async fn get_agent(
    endpoint: &str,
    api_key: &str,
    agent_id: &str,
) -> Result<AgentSummary, AgentsApiError> {
    directory_client(endpoint, api_key)?
        .get_agent(agent_id, None)
        .await
}
