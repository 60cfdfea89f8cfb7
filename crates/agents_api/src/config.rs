use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::url::normalize_endpoint;

/// API version selected on every request through the `api-version` query parameter.
pub const DEFAULT_API_VERSION: &str = "v1";
/// Outer bound for a single conversation HTTP call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Conventional prefix of agent identifiers.
pub const AGENT_ID_PREFIX: &str = "asst_";

/// One field of the credential bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    Endpoint,
    ApiKey,
    AgentId,
}

impl CredentialField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Endpoint => "endpoint",
            Self::ApiKey => "api key",
            Self::AgentId => "agent id",
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoint, API key and agent id supplied by the settings collaborator.
///
/// The bundle is immutable for the lifetime of one client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub endpoint: String,
    pub api_key: String,
    pub agent_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("agent_id", &self.agent_id)
            .finish()
    }
}

impl Credentials {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            agent_id: agent_id.into(),
        }
    }

    /// Fields that are empty or whitespace-only, in declaration order.
    pub fn missing_fields(&self) -> Vec<CredentialField> {
        [
            (CredentialField::Endpoint, &self.endpoint),
            (CredentialField::ApiKey, &self.api_key),
            (CredentialField::AgentId, &self.agent_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// Checks that all three fields are present and the endpoint is a usable URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ConfigError::MissingFields(missing));
        }

        normalize_endpoint(&self.endpoint)?;

        if !self.agent_id.trim().starts_with(AGENT_ID_PREFIX) {
            tracing::warn!(
                agent_id = %self.agent_id.trim(),
                "agent id does not use the conventional '{AGENT_ID_PREFIX}' prefix"
            );
        }

        Ok(())
    }

    /// Returns a copy with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            endpoint: self.endpoint.trim().to_owned(),
            api_key: self.api_key.trim().to_owned(),
            agent_id: self.agent_id.trim().to_owned(),
        }
    }
}

/// How the API key is presented to the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// `Authorization: Bearer <key>`; a key already starting with `Bearer ` is sent verbatim.
    #[default]
    BearerToken,
    /// `api-key: <key>`.
    ApiKeyHeader,
}

/// Transport configuration for agents API requests.
#[derive(Debug, Clone)]
pub struct AgentsApiConfig {
    pub credentials: Credentials,
    pub auth_mode: AuthMode,
    /// Value of the `api-version` query parameter.
    pub api_version: String,
    /// Fixed client identifier sent as `User-Agent`.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
}

impl AgentsApiConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            auth_mode: AuthMode::default(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            user_agent: default_user_agent(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            extra_headers: BTreeMap::new(),
        }
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}

fn default_user_agent() -> String {
    format!("agent-chat/{}", env!("CARGO_PKG_VERSION"))
}
