use std::collections::BTreeMap;

use crate::config::{AgentsApiConfig, AuthMode, CredentialField};
use crate::error::ConfigError;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_API_KEY: &str = "api-key";
pub const HEADER_USER_AGENT: &str = "user-agent";

const BEARER_PREFIX: &str = "Bearer ";

/// Build a deterministic header map for agents API requests.
///
/// Exactly one credential header is produced, chosen by [`AuthMode`]; the key
/// itself is never inspected beyond an explicit `Bearer ` prefix.
pub fn build_headers(config: &AgentsApiConfig) -> Result<BTreeMap<String, String>, ConfigError> {
    let api_key = config.credentials.api_key.trim();
    if api_key.is_empty() {
        return Err(ConfigError::MissingFields(vec![CredentialField::ApiKey]));
    }

    let mut headers = BTreeMap::new();
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );
    headers.insert(HEADER_ACCEPT.to_owned(), "application/json".to_owned());
    headers.insert(
        HEADER_USER_AGENT.to_owned(),
        config.user_agent.trim().to_owned(),
    );

    match config.auth_mode {
        AuthMode::BearerToken => {
            headers.insert(HEADER_AUTHORIZATION.to_owned(), bearer_value(api_key));
        }
        AuthMode::ApiKeyHeader => {
            headers.insert(HEADER_API_KEY.to_owned(), api_key.to_owned());
        }
    }

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    Ok(headers)
}

fn bearer_value(api_key: &str) -> String {
    if api_key.starts_with(BEARER_PREFIX) {
        api_key.to_owned()
    } else {
        format!("{BEARER_PREFIX}{api_key}")
    }
}
