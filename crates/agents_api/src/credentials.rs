//! Credential sources.
//!
//! [`CredentialProvider`] is the single seam through which a credential bundle
//! reaches the orchestrator. Settings UIs, environment variables and config
//! files all plug in here instead of each owning a copy of the service.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::{AuthMode, Credentials};
use crate::error::ConfigError;

pub const ENDPOINT_ENV_VAR: &str = "AGENT_CHAT_ENDPOINT";
pub const API_KEY_ENV_VAR: &str = "AGENT_CHAT_API_KEY";
pub const AGENT_ID_ENV_VAR: &str = "AGENT_CHAT_AGENT_ID";

/// Supplies a validated credential bundle.
pub trait CredentialProvider: Send + Sync {
    /// Short source name used in logs.
    fn source(&self) -> &str;

    /// Reads the bundle with surrounding whitespace trimmed, without validating it.
    fn load(&self) -> Result<Credentials, ConfigError>;

    /// Returns a complete bundle or the reason none is available.
    fn credentials(&self) -> Result<Credentials, ConfigError> {
        let credentials = self.load()?;
        credentials.validate()?;
        Ok(credentials)
    }

    /// Auth mode preferred by this source, if it records one.
    fn auth_mode(&self) -> Option<AuthMode> {
        None
    }
}

/// In-memory bundle handed over by a settings collaborator.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl CredentialProvider for StaticCredentials {
    fn source(&self) -> &str {
        "static"
    }

    fn load(&self) -> Result<Credentials, ConfigError> {
        Ok(self.credentials.trimmed())
    }
}

/// Reads the bundle from process environment variables.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    endpoint_var: String,
    api_key_var: String,
    agent_id_var: String,
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self {
            endpoint_var: ENDPOINT_ENV_VAR.to_owned(),
            api_key_var: API_KEY_ENV_VAR.to_owned(),
            agent_id_var: AGENT_ID_ENV_VAR.to_owned(),
        }
    }
}

impl EnvCredentials {
    pub fn with_var_names(
        endpoint_var: impl Into<String>,
        api_key_var: impl Into<String>,
        agent_id_var: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_var: endpoint_var.into(),
            api_key_var: api_key_var.into(),
            agent_id_var: agent_id_var.into(),
        }
    }

    fn read(name: &str) -> Result<String, ConfigError> {
        match std::env::var(name) {
            Ok(value) => Ok(value),
            Err(std::env::VarError::NotPresent) => Ok(String::new()),
            Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidEnvVar {
                name: name.to_owned(),
            }),
        }
    }
}

impl CredentialProvider for EnvCredentials {
    fn source(&self) -> &str {
        "environment"
    }

    fn load(&self) -> Result<Credentials, ConfigError> {
        Ok(Credentials::new(
            Self::read(&self.endpoint_var)?,
            Self::read(&self.api_key_var)?,
            Self::read(&self.agent_id_var)?,
        )
        .trimmed())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CredentialsFile {
    #[serde(default)]
    endpoint: String,
    #[serde(default)]
    api_key: String,
    #[serde(default)]
    agent_id: String,
    #[serde(default)]
    auth_mode: Option<AuthMode>,
}

/// Reads the bundle from a UTF-8 JSON file:
///
/// ```json
/// {
///   "endpoint": "https://<resource>.services.ai.azure.com/api/projects/<project>",
///   "api_key": "<token>",
///   "agent_id": "asst_...",
///   "auth_mode": "bearer_token"
/// }
/// ```
///
/// `auth_mode` is optional (`bearer_token` or `api_key_header`). Unknown fields
/// are rejected.
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<CredentialsFile, ConfigError> {
        let file_error = |message: String| ConfigError::File {
            path: self.path.display().to_string(),
            message,
        };
        let raw = std::fs::read_to_string(&self.path).map_err(|error| file_error(error.to_string()))?;
        serde_json::from_str(&raw).map_err(|error| file_error(error.to_string()))
    }
}

impl CredentialProvider for FileCredentials {
    fn source(&self) -> &str {
        "file"
    }

    fn load(&self) -> Result<Credentials, ConfigError> {
        let file = self.read()?;
        Ok(Credentials::new(file.endpoint, file.api_key, file.agent_id).trimmed())
    }

    fn auth_mode(&self) -> Option<AuthMode> {
        self.read().ok().and_then(|file| file.auth_mode)
    }
}

/// Tries each provider in order; the first complete bundle wins.
pub struct ChainedCredentials {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl ChainedCredentials {
    pub fn new(providers: Vec<Box<dyn CredentialProvider>>) -> Self {
        Self { providers }
    }

    fn first_success(&self) -> Result<&dyn CredentialProvider, ConfigError> {
        let mut last_error = ConfigError::NoSource;
        for provider in &self.providers {
            match provider.credentials() {
                Ok(_) => return Ok(provider.as_ref()),
                Err(error) => {
                    tracing::debug!(source = provider.source(), %error, "credential source unavailable");
                    last_error = error;
                }
            }
        }
        Err(last_error)
    }
}

impl CredentialProvider for ChainedCredentials {
    fn source(&self) -> &str {
        "chain"
    }

    fn load(&self) -> Result<Credentials, ConfigError> {
        self.credentials()
    }

    fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.first_success()?.credentials()
    }

    fn auth_mode(&self) -> Option<AuthMode> {
        self.first_success().ok().and_then(|provider| provider.auth_mode())
    }
}

/// Replaces the agent id of another source, e.g. from a `--agent-id` flag.
pub struct AgentIdOverride {
    inner: Box<dyn CredentialProvider>,
    agent_id: String,
}

impl AgentIdOverride {
    pub fn new(inner: Box<dyn CredentialProvider>, agent_id: impl Into<String>) -> Self {
        Self {
            inner,
            agent_id: agent_id.into(),
        }
    }
}

impl CredentialProvider for AgentIdOverride {
    fn source(&self) -> &str {
        self.inner.source()
    }

    fn load(&self) -> Result<Credentials, ConfigError> {
        let mut credentials = self.inner.load()?;
        credentials.agent_id = self.agent_id.trim().to_owned();
        Ok(credentials)
    }

    fn auth_mode(&self) -> Option<AuthMode> {
        self.inner.auth_mode()
    }
}
