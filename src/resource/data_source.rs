//! Data sources
//!
//! Read-only lookups derived from resource definitions: a single entity by
//! ID, a filtered list of entities, and the settings singleton.

use super::registry::{IdKind, ResourceDef, SettingsDef};
use super::schema::{state_from_response, AttrKind, AttrMode, AttributeDef, Schema};
use super::{id_to_string, DataSource, State};
use crate::client::{ApiClient, ResourceFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

fn computed(attributes: &[AttributeDef]) -> Vec<AttributeDef> {
    attributes
        .iter()
        .map(|a| {
            let mut a = a.clone();
            a.mode = AttrMode::Computed;
            a.nested = computed(&a.nested);
            a
        })
        .collect()
}

/// Look up one entity by ID
pub struct EntityDataSource {
    def: Arc<ResourceDef>,
}

impl EntityDataSource {
    pub fn new(def: Arc<ResourceDef>) -> Self {
        Self { def }
    }
}

#[async_trait]
impl DataSource for EntityDataSource {
    fn type_name(&self) -> &str {
        &self.def.name
    }

    fn schema(&self) -> Schema {
        let id_kind = match self.def.id_kind {
            IdKind::String => AttrKind::String,
            IdKind::Int64 => AttrKind::Int64,
        };
        // Write-only values never come back from a GET
        let attributes = computed(&self.def.attributes)
            .into_iter()
            .filter(|a| Some(&a.name) != self.def.post_response_attribute.as_ref())
            .map(|a| {
                if a.name == "id" {
                    AttributeDef::new("id", id_kind, AttrMode::Required)
                        .with_description("Identifier of the object to look up.")
                } else {
                    a
                }
            })
            .collect();

        Schema::new(
            &format!("Looks up a Blastshield {} by ID.", self.def.display_name.to_lowercase()),
            attributes,
        )
    }

    async fn read(&self, client: &ApiClient, config: &State) -> Result<State> {
        let id = config
            .get("id")
            .and_then(id_to_string)
            .with_context(|| format!("{} ID is empty", self.def.display_name))?;

        let entity = client
            .read(&self.def.entity_path(&id))
            .await
            .with_context(|| format!("Failed to read {} {}", self.def.display_name, id))?;

        let attributes = self.schema().attributes;
        let mut state = state_from_response(&attributes, &entity);

        if self.def.has_groups {
            let groups = client
                .get_groups(&self.def.path, &id)
                .await
                .with_context(|| {
                    format!("Failed to read groups of {} {}", self.def.display_name, id)
                })?;
            state.insert("groups".to_string(), serde_json::to_value(groups)?);
        }

        Ok(state)
    }
}

/// List entities, optionally filtered by query parameters
pub struct ListDataSource {
    def: Arc<ResourceDef>,
}

impl ListDataSource {
    pub fn new(def: Arc<ResourceDef>) -> Self {
        Self { def }
    }

    fn filters(&self, config: &State) -> Vec<ResourceFilter> {
        self.def
            .filters
            .iter()
            .filter_map(|f| {
                let values = match config.get(&f.name)? {
                    Value::Null => return None,
                    Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
                    other => scalar_to_string(other).into_iter().collect(),
                };
                Some(ResourceFilter::new(&f.name, values))
            })
            .collect()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[async_trait]
impl DataSource for ListDataSource {
    fn type_name(&self) -> &str {
        &self.def.plural
    }

    fn schema(&self) -> Schema {
        let mut attributes: Vec<AttributeDef> = self
            .def
            .filters
            .iter()
            .map(|f| {
                let mut f = f.clone();
                f.mode = AttrMode::Optional;
                f
            })
            .collect();

        let mut items =
            AttributeDef::new(&self.def.plural, AttrKind::ListNested, AttrMode::Computed)
                .with_description(&format!("Matching {}.", self.def.plural));
        items.nested = computed(&self.def.attributes)
            .into_iter()
            .filter(|a| Some(&a.name) != self.def.post_response_attribute.as_ref())
            .filter(|a| !a.skip_body)
            .collect();
        attributes.push(items);

        Schema::new(
            &format!("Lists Blastshield {}.", self.def.plural),
            attributes,
        )
    }

    async fn read(&self, client: &ApiClient, config: &State) -> Result<State> {
        let filters = self.filters(config);
        let items = client
            .list(&self.def.path, &filters)
            .await
            .with_context(|| format!("Failed to list {}", self.def.plural))?;

        tracing::debug!("Listed {} {}", items.len(), self.def.plural);

        let schema = self.schema();
        let nested = schema
            .attribute(&self.def.plural)
            .map(|a| a.nested.clone())
            .unwrap_or_default();

        let mut state = State::new();
        for filter in &self.def.filters {
            let value = config.get(&filter.name).cloned().unwrap_or(Value::Null);
            state.insert(filter.name.clone(), value);
        }
        state.insert(
            self.def.plural.clone(),
            Value::Array(
                items
                    .iter()
                    .map(|item| Value::Object(state_from_response(&nested, item)))
                    .collect(),
            ),
        );
        Ok(state)
    }
}

/// Global settings singleton
pub struct SettingsDataSource {
    def: Arc<SettingsDef>,
}

impl SettingsDataSource {
    pub fn new(def: Arc<SettingsDef>) -> Self {
        Self { def }
    }
}

#[async_trait]
impl DataSource for SettingsDataSource {
    fn type_name(&self) -> &str {
        "settings"
    }

    fn schema(&self) -> Schema {
        Schema::new("Reads Blastshield global settings.", computed(&self.def.attributes))
    }

    async fn read(&self, client: &ApiClient, _config: &State) -> Result<State> {
        let response = client
            .read(&self.def.path)
            .await
            .context("Failed to read settings")?;
        Ok(state_from_response(&self.def.attributes, &response))
    }
}
