use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::{AgentsApiConfig, CredentialField};
use crate::error::{parse_error_message, AgentsApiError, ConfigError};
use crate::headers::build_headers;
use crate::url::{endpoint_url, normalize_endpoint};

/// Optional cancellation signal shared across requests, retries and poll loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Authenticated HTTP client bound to one endpoint.
///
/// Stateless apart from its fixed configuration; safe to share behind an `Arc`.
#[derive(Debug)]
pub struct AgentsApiClient {
    http: Client,
    config: AgentsApiConfig,
    base_url: Url,
    headers: HeaderMap,
}

impl AgentsApiClient {
    /// Validates the credential bundle and prepares the default header set.
    ///
    /// Fails before any network call when a credential field is blank.
    pub fn new(config: AgentsApiConfig) -> Result<Self, AgentsApiError> {
        config.credentials.validate()?;
        Self::build(config)
    }

    /// Client for agent-independent reads (listing agents); the agent id may be blank.
    pub fn without_agent(config: AgentsApiConfig) -> Result<Self, AgentsApiError> {
        let missing: Vec<_> = config
            .credentials
            .missing_fields()
            .into_iter()
            .filter(|field| *field != CredentialField::AgentId)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingFields(missing).into());
        }
        Self::build(config)
    }

    fn build(config: AgentsApiConfig) -> Result<Self, AgentsApiError> {
        let base_url = normalize_endpoint(&config.credentials.endpoint)?;
        let headers = header_map(&config)?;
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AgentsApiError::from)?;

        Ok(Self {
            http,
            config,
            base_url,
            headers,
        })
    }

    pub fn config(&self) -> &AgentsApiConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn agent_id(&self) -> &str {
        self.config.credentials.agent_id.trim()
    }

    /// Full request URL for a path, including the `api-version` query parameter.
    pub fn url_for(&self, segments: &[&str]) -> Url {
        endpoint_url(&self.base_url, segments, &self.config.api_version)
    }

    /// Builds (but does not send) a request with the default headers.
    pub fn build_request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.http
            .request(method, self.url_for(segments))
            .headers(self.headers.clone())
    }

    /// Sends one JSON request with transient-failure retries.
    ///
    /// Returns the final status together with the decoded body (`Value::Null`
    /// for an empty body). Non-success statuses are returned as
    /// [`AgentsApiError::Status`] once retries are exhausted or when the status
    /// is not retryable.
    pub async fn request(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<(StatusCode, Value), AgentsApiError> {
        self.send_with_retry(
            || {
                let request = self.build_request(method.clone(), segments);
                match body {
                    Some(body) => request.json(body),
                    None => request,
                }
            },
            &method,
            segments,
            cancellation,
        )
        .await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<T, AgentsApiError> {
        let (_, value) = self.request(Method::GET, segments, None, cancellation).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<T, AgentsApiError> {
        let body = serde_json::to_value(body)?;
        let (_, value) = self
            .request(Method::POST, segments, Some(&body), cancellation)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Retry loop shared by JSON and multipart requests.
    ///
    /// `build` is called once per attempt so non-cloneable bodies can be rebuilt.
    pub(crate) async fn send_with_retry<F>(
        &self,
        build: F,
        method: &Method,
        segments: &[&str],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<(StatusCode, Value), AgentsApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let policy = self.config.retry;
        let path = segments.join("/");
        let mut attempt = 0u32;

        loop {
            if is_cancelled(cancellation) {
                return Err(AgentsApiError::Cancelled);
            }

            tracing::debug!(%method, path = %path, attempt, "sending agents API request");
            let response = await_or_cancel(build().send(), cancellation).await??;
            let status = response.status();
            let body = await_or_cancel(response.text(), cancellation)
                .await?
                .unwrap_or_default();

            if status.is_success() {
                return Ok((status, decode_body(&body)?));
            }

            let message = parse_error_message(status, &body);
            if crate::retry::is_retryable_status(status.as_u16()) && attempt < policy.max_retries {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    %method,
                    path = %path,
                    status = status.as_u16(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transient agents API failure, retrying"
                );
                await_or_cancel(tokio::time::sleep(delay), cancellation).await?;
                continue;
            }

            return Err(AgentsApiError::Status { status, message });
        }
    }

    /// Same headers as JSON requests, minus `content-type`, for multipart bodies.
    pub(crate) fn multipart_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.remove(CONTENT_TYPE);
        headers
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }
}

fn header_map(config: &AgentsApiConfig) -> Result<HeaderMap, AgentsApiError> {
    let headers = build_headers(config)?;
    let mut out = HeaderMap::new();
    for (key, value) in headers {
        out.insert(
            HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| AgentsApiError::InvalidHeader(format!("key: {key}")))?,
            HeaderValue::from_str(&value)
                .map_err(|_| AgentsApiError::InvalidHeader(format!("value for {key}")))?,
        );
    }
    Ok(out)
}

fn decode_body(body: &str) -> Result<Value, AgentsApiError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}

pub(crate) fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

/// Runs `future` to completion unless the cancellation signal trips first.
pub(crate) async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, AgentsApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(AgentsApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(AgentsApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
