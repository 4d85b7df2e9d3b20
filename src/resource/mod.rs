//! Resource abstraction layer
//!
//! This module provides a data-driven approach to managing Blastshield objects.
//! Resource definitions are loaded from per-version JSON catalogs compiled into
//! the binary, and a single generic implementation performs CRUD for all of them.
//!
//! # Architecture
//!
//! - [`schema`] - Attribute model and state/body conversion
//! - [`registry`] - Catalog of resource definitions parsed from JSON
//! - [`crud`] - Generic resource lifecycle over the REST API
//! - [`data_source`] - Single-entity, list and settings data sources
//!
//! # Resource Catalogs
//!
//! Catalogs live under `src/resources/`, one per supported API version:
//! - `v1_12.json` - API 1.12.x
//! - `v1_13.json` - API 1.13.x and later (adds tags to endpoints, policies,
//!   egress policies and proxies)

pub mod crud;
pub mod data_source;
pub mod registry;
pub mod schema;

pub use crud::ApiResource;
pub use data_source::{EntityDataSource, ListDataSource, SettingsDataSource};
pub use registry::{Catalog, IdKind, ResourceDef, SettingsDef};
pub use schema::{AttrKind, AttrMode, AttributeDef, Schema};

use crate::client::ApiClient;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Attribute values of one resource instance, keyed by attribute name
pub type State = Map<String, Value>;

/// A managed object with a full create/read/update/delete/import lifecycle
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name without the provider prefix
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    async fn create(&self, client: &ApiClient, plan: &State) -> Result<State>;

    /// Refresh state; `None` when the remote object no longer exists
    async fn read(&self, client: &ApiClient, state: &State) -> Result<Option<State>>;

    async fn update(&self, client: &ApiClient, prior: &State, plan: &State) -> Result<State>;

    async fn delete(&self, client: &ApiClient, state: &State) -> Result<()>;

    async fn import(&self, client: &ApiClient, id: &str) -> Result<State>;
}

/// A read-only lookup
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    async fn read(&self, client: &ApiClient, config: &State) -> Result<State>;
}

/// Constructor handed to the provider for each resource type
pub type ResourceFactory = Arc<dyn Fn() -> Box<dyn Resource> + Send + Sync>;

/// Constructor handed to the provider for each data source type
pub type DataSourceFactory = Arc<dyn Fn() -> Box<dyn DataSource> + Send + Sync>;

/// Build resource constructors for every entry of a catalog
pub fn resource_factories(catalog: &Catalog) -> Vec<ResourceFactory> {
    catalog
        .resources
        .values()
        .map(|def| {
            let def = Arc::new(def.clone());
            let factory: ResourceFactory =
                Arc::new(move || Box::new(ApiResource::new(Arc::clone(&def))) as Box<dyn Resource>);
            factory
        })
        .collect()
}

/// Build data source constructors: one single-entity and one list lookup per
/// resource, plus settings when the catalog defines it
pub fn data_source_factories(catalog: &Catalog) -> Vec<DataSourceFactory> {
    let mut factories: Vec<DataSourceFactory> = Vec::new();

    for def in catalog.resources.values() {
        let def = Arc::new(def.clone());

        let single = Arc::clone(&def);
        factories.push(Arc::new(move || {
            Box::new(EntityDataSource::new(Arc::clone(&single))) as Box<dyn DataSource>
        }));

        let list = Arc::clone(&def);
        factories.push(Arc::new(move || {
            Box::new(ListDataSource::new(Arc::clone(&list))) as Box<dyn DataSource>
        }));
    }

    if let Some(settings) = &catalog.settings {
        let settings = Arc::new(settings.clone());
        factories.push(Arc::new(move || {
            Box::new(SettingsDataSource::new(Arc::clone(&settings))) as Box<dyn DataSource>
        }));
    }

    factories
}

/// Render an ID attribute value as a path segment
pub(crate) fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
