use std::path::PathBuf;
use std::sync::Arc;

use agents_api::{
    AgentIdOverride, AgentsApiError, AuthMode, ChainedCredentials, ConfigError,
    CredentialProvider, EnvCredentials, FileCredentials, RunOrchestrator,
};
use thiserror::Error;

use crate::provider::ChatBackend;

mod agents;
mod mock;

pub use agents::AgentsBackend;
pub use mock::{MockBackend, MockStep, MOCK_AGENT_ID, MOCK_AGENT_NAME, MOCK_THREAD_ID};

pub const AGENTS_BACKEND_ID: &str = "agents";
pub const MOCK_BACKEND_ID: &str = "mock";
pub const DEFAULT_BACKEND_ID: &str = AGENTS_BACKEND_ID;
pub const BACKEND_ENV_VAR: &str = "AGENT_CHAT_BACKEND";

#[derive(Debug, Error)]
pub enum BackendInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] AgentsApiError),

    #[error("Unsupported backend '{0}'. Available backends: agents, mock")]
    Unsupported(String),
}

/// Where the agents backend takes its credentials and auth mode from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOptions {
    /// JSON credentials file; checked before the environment.
    pub config_path: Option<PathBuf>,
    /// Replaces the agent id from every source.
    pub agent_id: Option<String>,
    /// Wins over an `auth_mode` recorded in the credentials file.
    pub auth_mode: Option<AuthMode>,
}

/// Backend id from `AGENT_CHAT_BACKEND`, or the default.
pub fn backend_id_from_env() -> String {
    std::env::var(BACKEND_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_BACKEND_ID.to_string())
}

pub fn backend_for_id(
    backend_id: &str,
    options: &BackendOptions,
) -> Result<Arc<dyn ChatBackend>, BackendInitError> {
    match backend_id {
        AGENTS_BACKEND_ID => {
            let source = credential_source(options);
            let orchestrator = RunOrchestrator::from_provider(&source, options.auth_mode)?;
            Ok(Arc::new(AgentsBackend::new(orchestrator)))
        }
        MOCK_BACKEND_ID => Ok(Arc::new(MockBackend::default())),
        unknown => Err(BackendInitError::Unsupported(unknown.to_string())),
    }
}

/// Credentials file first (when given), then the `AGENT_CHAT_*` environment.
pub fn credential_source(options: &BackendOptions) -> ChainedCredentials {
    let mut sources: Vec<Box<dyn CredentialProvider>> = Vec::new();
    if let Some(path) = &options.config_path {
        sources.push(Box::new(FileCredentials::new(path)));
    }
    sources.push(Box::new(EnvCredentials::default()));

    let sources = match options.agent_id.as_deref().map(str::trim) {
        Some(agent_id) if !agent_id.is_empty() => sources
            .into_iter()
            .map(|source| {
                Box::new(AgentIdOverride::new(source, agent_id)) as Box<dyn CredentialProvider>
            })
            .collect(),
        _ => sources,
    };

    ChainedCredentials::new(sources)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn backend_for_id_supports_mock() {
        let backend = backend_for_id(MOCK_BACKEND_ID, &BackendOptions::default())
            .expect("mock backend should resolve");
        assert_eq!(backend.profile().backend_id, "mock");
        assert_eq!(backend.profile().agent_id, MOCK_AGENT_ID);
    }

    #[test]
    fn backend_for_id_rejects_unknown_backend() {
        let error = match backend_for_id("custom", &BackendOptions::default()) {
            Ok(_) => panic!("unknown backends should fail"),
            Err(error) => error,
        };

        assert!(error.to_string().contains("Unsupported backend 'custom'"));
    }

    #[test]
    fn agents_backend_reads_file_and_overrides_agent() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            br#"{"endpoint":"https://host.test/api/projects/p","api_key":"k","agent_id":"asst_file"}"#,
        )
        .expect("write");

        let options = BackendOptions {
            config_path: Some(file.path().to_path_buf()),
            agent_id: Some("asst_flag".to_string()),
            auth_mode: None,
        };
        let backend = backend_for_id(AGENTS_BACKEND_ID, &options).expect("agents backend");
        assert_eq!(backend.profile().backend_id, "agents");
        assert_eq!(backend.profile().agent_id, "asst_flag");
    }

    #[test]
    fn agent_flag_completes_a_file_without_agent_id() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(br#"{"endpoint":"https://host.test","api_key":"k"}"#)
            .expect("write");

        let options = BackendOptions {
            config_path: Some(file.path().to_path_buf()),
            agent_id: Some(" asst_flag ".to_string()),
            auth_mode: Some(AuthMode::ApiKeyHeader),
        };
        let credentials = credential_source(&options)
            .credentials()
            .expect("credentials");
        assert_eq!(credentials.endpoint, "https://host.test");
        assert_eq!(credentials.agent_id, "asst_flag");
    }
}
