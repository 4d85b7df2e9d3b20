//! Provider surface
//!
//! Holds the implementation chosen at dispatch and the configured API client,
//! and routes lifecycle requests to resources and data sources by type name.

use crate::client::ApiClient;
use crate::config::ProviderConfig;
use crate::dispatch::{HOST_ENV, TOKEN_ENV};
use crate::resource::{
    AttrKind, AttrMode, AttributeDef, DataSource, DataSourceFactory, Resource, ResourceFactory,
    Schema, State,
};
use crate::versions::VersionedProvider;
use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Provider type name; resource types are prefixed with it
pub const TYPE_NAME: &str = "blastshield";

/// Configuration problem tied to one attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub attribute: String,
    pub summary: String,
    pub detail: String,
}

/// Configure failed; one diagnostic per problem
#[derive(Debug, thiserror::Error)]
#[error("{}", .0.iter().map(|d| d.summary.as_str()).collect::<Vec<_>>().join("; "))]
pub struct ConfigureError(pub Vec<Diagnostic>);

pub struct Provider {
    version: String,
    api_version: Option<String>,
    resources: BTreeMap<String, ResourceFactory>,
    data_sources: BTreeMap<String, DataSourceFactory>,
    client: Option<ApiClient>,
}

fn full_type_name(name: &str) -> String {
    format!("{}_{}", TYPE_NAME, name)
}

impl Provider {
    /// Build a provider around the dispatched implementation
    ///
    /// With no implementation the provider exposes no resources or data sources.
    pub fn new(version: &str, implementation: Option<Arc<dyn VersionedProvider>>) -> Self {
        let mut resources = BTreeMap::new();
        let mut data_sources = BTreeMap::new();
        let mut api_version = None;

        if let Some(implementation) = implementation {
            api_version = Some(implementation.api_version().to_string());
            for factory in implementation.resources() {
                let name = full_type_name(factory().type_name());
                resources.insert(name, factory);
            }
            for factory in implementation.data_sources() {
                let name = full_type_name(factory().type_name());
                data_sources.insert(name, factory);
            }
        }

        Self {
            version: version.to_string(),
            api_version,
            resources,
            data_sources,
            client: None,
        }
    }

    /// Provider type name and release version
    pub fn metadata(&self) -> (&str, &str) {
        (TYPE_NAME, &self.version)
    }

    /// API version of the selected implementation
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    pub fn schema(&self) -> Schema {
        Schema::new(
            "Terraform provider for managing Blastshield resources.",
            vec![
                AttributeDef::new("host", AttrKind::String, AttrMode::Optional)
                    .with_description(&format!(
                        "The Blastshield API host URL. \
                         Can also be set via the {} environment variable.",
                        HOST_ENV
                    )),
                AttributeDef::new("token", AttrKind::String, AttrMode::Optional)
                    .with_description(&format!(
                        "The Blastshield API token. \
                         Can also be set via the {} environment variable.",
                        TOKEN_ENV
                    ))
                    .sensitive(),
            ],
        )
    }

    /// Create the API client; host and token must both be present
    pub fn configure(&mut self, config: &ProviderConfig) -> Result<(), ConfigureError> {
        let mut diagnostics = Vec::new();

        if config.host.as_deref().map_or(true, str::is_empty) {
            diagnostics.push(Diagnostic {
                attribute: "host".to_string(),
                summary: "Missing Blastshield API Host".to_string(),
                detail: format!(
                    "The provider cannot create the Blastshield API client as there is a \
                     missing or empty value for the Blastshield API host. \
                     Set the host value in the configuration or use the {} environment variable.",
                    HOST_ENV
                ),
            });
        }
        if config.token.as_deref().map_or(true, str::is_empty) {
            diagnostics.push(Diagnostic {
                attribute: "token".to_string(),
                summary: "Missing Blastshield API Token".to_string(),
                detail: format!(
                    "The provider cannot create the Blastshield API client as there is a \
                     missing or empty value for the Blastshield API token. \
                     Set the token value in the configuration or use the {} environment variable.",
                    TOKEN_ENV
                ),
            });
        }
        if !diagnostics.is_empty() {
            return Err(ConfigureError(diagnostics));
        }

        let host = config.host.as_deref().unwrap_or_default();
        let token = config.token.as_deref().unwrap_or_default();
        let client = ApiClient::new(host, token).map_err(|e| {
            ConfigureError(vec![Diagnostic {
                attribute: "host".to_string(),
                summary: "Unable to Create Blastshield API Client".to_string(),
                detail: e.to_string(),
            }])
        })?;

        tracing::info!("Configured Blastshield client for {}", client.host());
        self.client = Some(client);
        Ok(())
    }

    /// Resource type names, sorted
    pub fn resources(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Data source type names, sorted
    pub fn data_sources(&self) -> Vec<&str> {
        self.data_sources.keys().map(String::as_str).collect()
    }

    pub fn resource(&self, type_name: &str) -> Result<Box<dyn Resource>> {
        self.resources
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| anyhow!("Unknown resource type: {}", type_name))
    }

    pub fn data_source(&self, type_name: &str) -> Result<Box<dyn DataSource>> {
        self.data_sources
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| anyhow!("Unknown data source type: {}", type_name))
    }

    fn client(&self) -> Result<&ApiClient> {
        self.client
            .as_ref()
            .context("Provider is not configured; call configure first")
    }

    pub async fn create(&self, type_name: &str, plan: &State) -> Result<State> {
        let resource = self.resource(type_name)?;
        resource.create(self.client()?, plan).await
    }

    pub async fn read(&self, type_name: &str, state: &State) -> Result<Option<State>> {
        let resource = self.resource(type_name)?;
        resource.read(self.client()?, state).await
    }

    pub async fn update(&self, type_name: &str, prior: &State, plan: &State) -> Result<State> {
        let resource = self.resource(type_name)?;
        resource.update(self.client()?, prior, plan).await
    }

    pub async fn delete(&self, type_name: &str, state: &State) -> Result<()> {
        let resource = self.resource(type_name)?;
        resource.delete(self.client()?, state).await
    }

    pub async fn import_state(&self, type_name: &str, id: &str) -> Result<State> {
        let resource = self.resource(type_name)?;
        resource.import(self.client()?, id).await
    }

    pub async fn read_data_source(&self, type_name: &str, config: &State) -> Result<State> {
        let data_source = self.data_source(type_name)?;
        data_source.read(self.client()?, config).await
    }

    /// Provider, resource and data source schemas as one JSON document
    pub fn schemas_json(&self) -> Result<Value> {
        let mut resource_schemas = serde_json::Map::new();
        for (name, factory) in &self.resources {
            resource_schemas.insert(name.clone(), serde_json::to_value(factory().schema())?);
        }
        let mut data_source_schemas = serde_json::Map::new();
        for (name, factory) in &self.data_sources {
            data_source_schemas.insert(name.clone(), serde_json::to_value(factory().schema())?);
        }

        Ok(json!({
            "provider": {
                "name": TYPE_NAME,
                "version": self.version,
                "api_version": self.api_version,
                "schema": serde_json::to_value(self.schema())?,
            },
            "resource_schemas": resource_schemas,
            "data_source_schemas": data_source_schemas,
        }))
    }
}
