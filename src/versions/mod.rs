//! Versioned implementations
//!
//! Each supported API version contributes one implementation: the set of
//! resources and data sources that match that version's REST surface. All of
//! them are registered into a [`Registry`] at startup, and the dispatcher picks
//! exactly one for the life of the process.
//!
//! # Module Structure
//!
//! - [`registry`] - Version-keyed registry and selection
//! - [`v1_12`] - API 1.12.x
//! - [`v1_13`] - API 1.13.x and later

pub mod registry;
pub mod v1_12;
pub mod v1_13;

pub use registry::{Registry, SelectionError};

use crate::resource::{self, Catalog, DataSourceFactory, ResourceFactory};
use anyhow::{Context, Result};

/// Resources and data sources for one API version
pub trait VersionedProvider: Send + Sync {
    /// Version this implementation was built for
    fn api_version(&self) -> &str;

    fn resources(&self) -> Vec<ResourceFactory>;

    fn data_sources(&self) -> Vec<DataSourceFactory>;
}

/// Implementation driven by an embedded resource catalog
pub struct CatalogProvider {
    catalog: Catalog,
}

impl CatalogProvider {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Parse the catalog and check it was generated for `expected_version`
    pub fn from_json(expected_version: &str, content: &str) -> Result<Self> {
        let catalog = Catalog::from_json(content)
            .with_context(|| format!("Invalid catalog for API version {}", expected_version))?;
        if catalog.api_version != expected_version {
            anyhow::bail!(
                "Catalog declares API version {} but is registered as {}",
                catalog.api_version,
                expected_version
            );
        }
        Ok(Self::new(catalog))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl VersionedProvider for CatalogProvider {
    fn api_version(&self) -> &str {
        &self.catalog.api_version
    }

    fn resources(&self) -> Vec<ResourceFactory> {
        resource::resource_factories(&self.catalog)
    }

    fn data_sources(&self) -> Vec<DataSourceFactory> {
        resource::data_source_factories(&self.catalog)
    }
}

/// Register every compiled API version
pub fn register_all(registry: &Registry) -> Result<()> {
    v1_12::register(registry)?;
    v1_13::register(registry)?;
    tracing::debug!(
        "Registered API versions: {}",
        registry.registered_versions().join(", ")
    );
    Ok(())
}
