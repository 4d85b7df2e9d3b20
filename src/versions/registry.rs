//! Implementation Registry
//!
//! Maps API version strings to the implementation that serves them, and
//! selects the highest registered implementation not exceeding a server's
//! reported version.

use super::VersionedProvider;
use crate::version::{ParseError, Version};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Errors from selecting an implementation for a server version
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("invalid server version {server_version:?}: {source}")]
    InvalidServerVersion {
        server_version: String,
        #[source]
        source: ParseError,
    },

    #[error(
        "server version {server_version} is below all supported versions [{}]",
        .supported.join(", ")
    )]
    NoCompatibleVersion {
        server_version: String,
        supported: Vec<String>,
    },
}

/// Registry of versioned implementations
///
/// Keys are kept sorted, so selection is deterministic even when two
/// spellings parse to the same version: the first key in sorted order wins.
#[derive(Default)]
pub struct Registry {
    entries: Mutex<BTreeMap<String, Arc<dyn VersionedProvider>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Arc<dyn VersionedProvider>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace the implementation for a version string
    ///
    /// The key is not validated; a key that does not parse is never selected.
    pub fn register(&self, version: &str, provider: Arc<dyn VersionedProvider>) {
        let previous = self.lock().insert(version.to_string(), provider);
        if previous.is_some() {
            tracing::debug!("Replaced implementation registered for API version {}", version);
        }
    }

    /// Copy of the entries, so parsing happens outside the lock
    fn snapshot(&self) -> Vec<(String, Arc<dyn VersionedProvider>)> {
        self.lock()
            .iter()
            .map(|(key, provider)| (key.clone(), Arc::clone(provider)))
            .collect()
    }

    /// Highest parseable entry accepted by `accept`
    fn best_match(
        &self,
        accept: impl Fn(&Version) -> bool,
    ) -> Option<(Arc<dyn VersionedProvider>, String)> {
        let mut best: Option<(Version, String, Arc<dyn VersionedProvider>)> = None;

        for (key, provider) in self.snapshot() {
            let Ok(version) = Version::parse(&key) else {
                tracing::debug!("Skipping unparseable registry key {:?}", key);
                continue;
            };
            if !accept(&version) {
                continue;
            }
            let better = match &best {
                Some((current, _, _)) => version > *current,
                None => true,
            };
            if better {
                best = Some((version, key, provider));
            }
        }

        best.map(|(_, key, provider)| (provider, key))
    }

    /// Return the highest registered implementation whose version is <= `server_version`
    pub fn select_for_server(
        &self,
        server_version: &str,
    ) -> Result<(Arc<dyn VersionedProvider>, String), SelectionError> {
        let server = Version::parse(server_version).map_err(|source| {
            SelectionError::InvalidServerVersion {
                server_version: server_version.to_string(),
                source,
            }
        })?;

        self.best_match(|candidate| *candidate <= server)
            .ok_or_else(|| SelectionError::NoCompatibleVersion {
                server_version: server_version.to_string(),
                supported: self.registered_versions(),
            })
    }

    /// Return the highest registered implementation, if any key parses
    pub fn select_latest(&self) -> Option<(Arc<dyn VersionedProvider>, String)> {
        self.best_match(|_| true)
    }

    /// All registered keys, sorted
    pub fn registered_versions(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.lock().clear();
    }
}
