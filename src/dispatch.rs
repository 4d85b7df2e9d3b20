//! Dispatcher
//!
//! Runs once at startup, before any request is handled: discover the server's
//! API version, then pick the implementation that serves it.
//!
//! ```text
//! Init ──credentials──> Discovering ──ok──> Selecting ──ok──> Ready
//!   │                       │                   └──err──> Fatal
//!   │                       └──err──> Fallback ──> Ready (latest or none)
//!   └──no credentials──────────────> Fallback
//! ```

use crate::discovery::{self, DiscoveryError};
use crate::versions::{Registry, SelectionError, VersionedProvider};
use std::sync::Arc;

/// Environment variable holding the API host URL
pub const HOST_ENV: &str = "BLASTSHIELD_HOST";

/// Environment variable holding the API bearer token
pub const TOKEN_ENV: &str = "BLASTSHIELD_TOKEN";

/// Host and token used for discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub token: String,
}

impl Credentials {
    /// Both values must be non-empty
    pub fn new(host: Option<String>, token: Option<String>) -> Option<Self> {
        let host = host.filter(|h| !h.is_empty())?;
        let token = token.filter(|t| !t.is_empty())?;
        Some(Self { host, token })
    }

    /// Read `BLASTSHIELD_HOST` and `BLASTSHIELD_TOKEN`
    pub fn from_env() -> Option<Self> {
        Self::new(std::env::var(HOST_ENV).ok(), std::env::var(TOKEN_ENV).ok())
    }
}

/// Why dispatch fell back to the latest implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    NoCredentials,
    DiscoveryFailed(String),
}

/// How the implementation was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchPath {
    Matched { server_version: String },
    Fallback(FallbackReason),
}

/// Outcome of a successful dispatch
#[derive(Clone)]
pub struct Selection {
    /// `None` only when nothing is registered
    pub implementation: Option<Arc<dyn VersionedProvider>>,
    /// Registry key of the chosen implementation
    pub api_version: Option<String>,
    pub path: DispatchPath,
}

impl Selection {
    /// No implementation: nothing is exposed
    pub fn empty(path: DispatchPath) -> Self {
        Self {
            implementation: None,
            api_version: None,
            path,
        }
    }
}

/// Fatal dispatch outcome; startup must abort
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(
        "API version {server_version} not supported (supported versions: [{}]): {source}",
        .supported.join(", ")
    )]
    Unsupported {
        server_version: String,
        supported: Vec<String>,
        #[source]
        source: SelectionError,
    },
}

/// Pick the implementation for this process
pub async fn detect_version(
    registry: &Registry,
    credentials: Option<&Credentials>,
) -> Result<Selection, DispatchError> {
    let Some(credentials) = credentials else {
        let selection = fallback(registry, FallbackReason::NoCredentials);
        if let Some(ver) = &selection.api_version {
            tracing::info!(
                "No {}/{} set, using latest API version: {}",
                HOST_ENV,
                TOKEN_ENV,
                ver
            );
        }
        return Ok(selection);
    };

    match discovery::fetch_server_version(&credentials.host, &credentials.token).await {
        Ok(server_version) => select(registry, &server_version),
        Err(err) => Ok(discovery_failed(registry, &credentials.host, err)),
    }
}

fn select(registry: &Registry, server_version: &str) -> Result<Selection, DispatchError> {
    match registry.select_for_server(server_version) {
        Ok((implementation, ver)) => {
            tracing::info!(
                "Server API version: {}, using provider version: {}",
                server_version,
                ver
            );
            Ok(Selection {
                implementation: Some(implementation),
                api_version: Some(ver),
                path: DispatchPath::Matched {
                    server_version: server_version.to_string(),
                },
            })
        }
        Err(source) => {
            tracing::error!("API version {} not supported: {}", server_version, source);
            Err(DispatchError::Unsupported {
                server_version: server_version.to_string(),
                supported: registry.registered_versions(),
                source,
            })
        }
    }
}

fn discovery_failed(registry: &Registry, host: &str, err: DiscoveryError) -> Selection {
    tracing::warn!(
        "Could not fetch API version from {}: {}, using latest compiled version",
        host,
        err
    );
    let selection = fallback(registry, FallbackReason::DiscoveryFailed(err.to_string()));
    if let Some(ver) = &selection.api_version {
        tracing::info!("Using latest API version: {}", ver);
    }
    selection
}

fn fallback(registry: &Registry, reason: FallbackReason) -> Selection {
    let path = DispatchPath::Fallback(reason);
    match registry.select_latest() {
        Some((implementation, ver)) => Selection {
            implementation: Some(implementation),
            api_version: Some(ver),
            path,
        },
        None => {
            tracing::warn!("No API versions registered; no resources will be exposed");
            Selection::empty(path)
        }
    }
}
