use url::Url;

use crate::error::ConfigError;

/// Query parameter carrying the API version on every request.
pub const API_VERSION_PARAM: &str = "api-version";

/// Normalize a configured endpoint into a base URL.
///
/// Normalization rules:
/// 1) surrounding whitespace and trailing `/` are removed
/// 2) the result must be an absolute `http` or `https` URL
/// 3) any query string or fragment on the configured value is dropped
pub fn normalize_endpoint(input: &str) -> Result<Url, ConfigError> {
    let trimmed = input.trim().trim_end_matches('/');
    let mut url = Url::parse(trimmed)
        .map_err(|error| ConfigError::InvalidEndpoint(format!("{trimmed}: {error}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEndpoint(format!(
            "{trimmed}: unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ConfigError::InvalidEndpoint(format!(
            "{trimmed}: URL has no host"
        )));
    }

    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Build `<base>/<segments...>?api-version=<version>`.
///
/// Each segment is percent-encoded independently, so opaque server ids can
/// never inject extra path components.
pub fn endpoint_url(base: &Url, segments: &[&str], api_version: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty();
        path.extend(segments);
    }
    url.query_pairs_mut()
        .append_pair(API_VERSION_PARAM, api_version);
    url
}
