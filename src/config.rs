//! Configuration Management
//!
//! Persistent settings and resolution of the provider's host/token.

use crate::dispatch::{Credentials, HOST_ENV, TOKEN_ENV};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// API host URL
    #[serde(default)]
    pub host: Option<String>,
    /// API bearer token
    #[serde(default)]
    pub token: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("blastshield").join("config.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!("Could not read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path().context("No configuration directory on this system")?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Layer `other` on top of `self`; set values in `other` win
    pub fn merge(mut self, other: Config) -> Self {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.token.is_some() {
            self.token = other.token;
        }
        self
    }
}

/// Host and token handed to `Provider::configure`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub host: Option<String>,
    pub token: Option<String>,
}

impl ProviderConfig {
    /// Environment values, overridden by explicitly configured ones
    pub fn resolve(explicit: &Config) -> Self {
        Self::resolve_with(
            std::env::var(HOST_ENV).ok(),
            std::env::var(TOKEN_ENV).ok(),
            explicit,
        )
    }

    pub fn resolve_with(
        env_host: Option<String>,
        env_token: Option<String>,
        explicit: &Config,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            host: non_empty(explicit.host.clone()).or(non_empty(env_host)),
            token: non_empty(explicit.token.clone()).or(non_empty(env_token)),
        }
    }

    /// Both values, if present
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::new(self.host.clone(), self.token.clone())
    }
}
