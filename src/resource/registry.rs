//! Resource Catalog - Load resource definitions from JSON
//!
//! Each supported API version ships an embedded JSON catalog describing the
//! objects it exposes. A catalog is parsed once by its version module and
//! shared by every resource and data source built from it.

use super::schema::AttributeDef;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Type of an entity's primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    String,
    Int64,
}

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    /// Type name without the provider prefix ("node"); filled from the catalog key
    #[serde(skip)]
    pub name: String,
    pub display_name: String,
    pub plural: String,
    /// Collection path, always with a trailing slash ("/nodes/")
    pub path: String,
    pub id_kind: IdKind,
    pub attributes: Vec<AttributeDef>,
    /// Group memberships live under `{path}{id}/groups`
    #[serde(default)]
    pub has_groups: bool,
    /// POST returns an invitation instead of the entity
    #[serde(default)]
    pub store_post_response: bool,
    #[serde(default = "default_post_id_field")]
    pub post_id_field: String,
    /// Attribute holding the base64-encoded POST response
    #[serde(default)]
    pub post_response_attribute: Option<String>,
    /// Query parameters accepted by the list endpoint
    #[serde(default)]
    pub filters: Vec<AttributeDef>,
}

fn default_post_id_field() -> String {
    "id".to_string()
}

impl ResourceDef {
    /// Path of a single entity
    pub fn entity_path(&self, id: &str) -> String {
        format!("{}{}", self.path, id)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Settings singleton definition
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsDef {
    pub path: String,
    pub attributes: Vec<AttributeDef>,
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    pub api_version: String,
    #[serde(default)]
    pub settings: Option<SettingsDef>,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceDef>,
}

impl Catalog {
    /// Parse a catalog from its JSON source
    pub fn from_json(content: &str) -> Result<Self> {
        let mut catalog: Catalog =
            serde_json::from_str(content).context("Failed to parse resource catalog JSON")?;

        for (key, def) in catalog.resources.iter_mut() {
            def.name = key.clone();
            if !def.path.ends_with('/') {
                def.path.push('/');
            }
        }

        tracing::debug!(
            "Loaded catalog for API {} with {} resources",
            catalog.api_version,
            catalog.resources.len()
        );
        Ok(catalog)
    }

    /// Get a resource definition by key
    pub fn get_resource(&self, key: &str) -> Option<&ResourceDef> {
        self.resources.get(key)
    }

    /// Get all resource keys, sorted
    pub fn resource_keys(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdKind::String => write!(f, "string"),
            IdKind::Int64 => write!(f, "int64"),
        }
    }
}
