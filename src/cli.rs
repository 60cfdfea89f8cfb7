//! Command-line arguments.

use std::path::PathBuf;

use agents_api::AuthMode;
use clap::{Parser, ValueEnum};

use crate::providers::{BackendOptions, MOCK_BACKEND_ID};

/// Chat with a hosted agent from the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "agent-chat",
    version,
    about = "Terminal chat client for hosted agents",
    long_about = "Sends each message as a run on a server-side thread, polls the run until it \
                  settles, and prints the agent's latest reply. Credentials come from --config \
                  or the AGENT_CHAT_ENDPOINT, AGENT_CHAT_API_KEY and AGENT_CHAT_AGENT_ID \
                  environment variables."
)]
pub struct Args {
    /// JSON credentials file, checked before the environment.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Agent to talk to; replaces the agent id from every credential source.
    #[arg(long)]
    pub agent_id: Option<String>,

    /// How the API key is sent. Defaults to the credentials file, then bearer.
    #[arg(long, value_enum)]
    pub auth_mode: Option<AuthModeArg>,

    /// Backend to use (`agents` or `mock`). Defaults to AGENT_CHAT_BACKEND, then `agents`.
    #[arg(long)]
    pub backend: Option<String>,

    /// Shorthand for `--backend mock`.
    #[arg(long, conflicts_with = "backend")]
    pub mock: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthModeArg {
    /// `Authorization: Bearer <key>`.
    Bearer,
    /// `api-key: <key>`.
    ApiKey,
}

impl From<AuthModeArg> for AuthMode {
    fn from(value: AuthModeArg) -> Self {
        match value {
            AuthModeArg::Bearer => AuthMode::BearerToken,
            AuthModeArg::ApiKey => AuthMode::ApiKeyHeader,
        }
    }
}

impl Args {
    /// Explicit backend choice, if any flag made one.
    pub fn backend_id(&self) -> Option<String> {
        if self.mock {
            return Some(MOCK_BACKEND_ID.to_string());
        }
        self.backend.clone()
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            config_path: self.config.clone(),
            agent_id: self.agent_id.clone(),
            auth_mode: self.auth_mode.map(AuthMode::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_backend_options() {
        let args = Args::parse_from([
            "agent-chat",
            "--config",
            "creds.json",
            "--agent-id",
            "asst_1",
            "--auth-mode",
            "api-key",
        ]);

        assert_eq!(
            args.backend_options(),
            BackendOptions {
                config_path: Some(PathBuf::from("creds.json")),
                agent_id: Some("asst_1".to_string()),
                auth_mode: Some(AuthMode::ApiKeyHeader),
            }
        );
        assert_eq!(args.backend_id(), None);
        assert_eq!(args.log_level, "warn");
    }

    #[test]
    fn mock_flag_selects_mock_backend() {
        let args = Args::parse_from(["agent-chat", "--mock"]);
        assert_eq!(args.backend_id().as_deref(), Some("mock"));
    }

    #[test]
    fn mock_conflicts_with_backend() {
        assert!(Args::try_parse_from(["agent-chat", "--mock", "--backend", "agents"]).is_err());
    }
}
