//! Version Discovery
//!
//! Fetches the server's OpenAPI descriptor and extracts `info.version`.

use crate::client::http::HttpClient;
use crate::client::ApiError;
use reqwest::Method;
use serde::Deserialize;
use std::time::Duration;

/// Path of the descriptor, relative to the API host
pub const DESCRIPTOR_PATH: &str = "/openapi.json";

/// Upper bound on the discovery request
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from fetching the server's API version
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("fetching openapi.json: {0}")]
    Fetch(#[from] ApiError),

    #[error("parsing openapi.json: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("openapi.json missing info.version")]
    MissingVersion,
}

#[derive(Debug, Deserialize)]
struct Descriptor {
    #[serde(default)]
    info: Option<Info>,
}

#[derive(Debug, Deserialize)]
struct Info {
    #[serde(default)]
    version: Option<String>,
}

/// Fetch the API version reported by `host`
pub async fn fetch_server_version(host: &str, token: &str) -> Result<String, DiscoveryError> {
    fetch_server_version_with_timeout(host, token, DISCOVERY_TIMEOUT).await
}

/// Same as [`fetch_server_version`] with an explicit timeout
pub async fn fetch_server_version_with_timeout(
    host: &str,
    token: &str,
    timeout: Duration,
) -> Result<String, DiscoveryError> {
    let http = HttpClient::new(timeout)?;
    let url = format!("{}{}", host.trim_end_matches('/'), DESCRIPTOR_PATH);

    let body = http.send(Method::GET, &url, token, None).await?;
    let descriptor: Descriptor = serde_json::from_value(body).map_err(DiscoveryError::Parse)?;

    let version = descriptor
        .info
        .and_then(|info| info.version)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(DiscoveryError::MissingVersion)?;

    tracing::debug!("Server at {} reports API version {}", host, version);
    Ok(version)
}
