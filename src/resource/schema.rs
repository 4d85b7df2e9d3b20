//! Schema model
//!
//! Describes the attributes of resources and data sources, and converts
//! between Terraform-style state objects and API request/response bodies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKind {
    String,
    Int64,
    Bool,
    ListString,
    ListInt64,
    MapString,
    /// Free-form JSON object (settings blocks)
    Dynamic,
    /// List of nested objects described by `AttributeDef::nested`
    ListNested,
}

/// How an attribute is populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrMode {
    /// Must be set in configuration
    Required,
    /// May be set in configuration; the API fills it in otherwise
    Optional,
    /// Set by the API only
    Computed,
}

/// Attribute definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    pub kind: AttrKind,
    pub mode: AttrMode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    /// Written through a separate endpoint, never in the main request body
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_body: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<AttributeDef>,
}

impl AttributeDef {
    pub fn new(name: &str, kind: AttrKind, mode: AttrMode) -> Self {
        Self {
            name: name.to_string(),
            kind,
            mode,
            description: String::new(),
            sensitive: false,
            skip_body: false,
            nested: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn is_configurable(&self) -> bool {
        matches!(self.mode, AttrMode::Required | AttrMode::Optional)
    }

    pub fn is_required(&self) -> bool {
        self.mode == AttrMode::Required
    }
}

/// Schema of a resource, data source or the provider itself
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    pub version: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub attributes: Vec<AttributeDef>,
}

impl Schema {
    pub fn new(description: &str, attributes: Vec<AttributeDef>) -> Self {
        Self {
            version: 0,
            description: description.to_string(),
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Check that every required attribute is present and non-null
    pub fn missing_required(&self, state: &Map<String, Value>) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|a| a.is_required())
            .filter(|a| state.get(&a.name).map_or(true, Value::is_null))
            .map(|a| a.name.clone())
            .collect()
    }
}

/// Build an API request body from configured attributes, omitting nulls
pub fn request_body(attributes: &[AttributeDef], state: &Map<String, Value>) -> Map<String, Value> {
    attributes
        .iter()
        .filter(|a| a.is_configurable() && !a.skip_body)
        .filter_map(|a| {
            let value = state.get(&a.name)?;
            if value.is_null() {
                return None;
            }
            Some((a.name.clone(), nested_request_value(a, value)))
        })
        .collect()
}

fn nested_request_value(attr: &AttributeDef, value: &Value) -> Value {
    if attr.kind != AttrKind::ListNested || attr.nested.is_empty() {
        return value.clone();
    }
    match value.as_array() {
        Some(items) => Value::Array(
            items
                .iter()
                .map(|item| match item.as_object() {
                    Some(obj) => Value::Object(request_body_all(&attr.nested, obj)),
                    None => item.clone(),
                })
                .collect(),
        ),
        None => value.clone(),
    }
}

// Nested objects send every set field, including ones marked computed
fn request_body_all(attributes: &[AttributeDef], obj: &Map<String, Value>) -> Map<String, Value> {
    attributes
        .iter()
        .filter_map(|a| {
            let value = obj.get(&a.name)?;
            (!value.is_null()).then(|| (a.name.clone(), value.clone()))
        })
        .collect()
}

/// Project an API response onto schema attributes
///
/// Every attribute is present in the result; missing response fields become null.
pub fn state_from_response(attributes: &[AttributeDef], response: &Value) -> Map<String, Value> {
    attributes
        .iter()
        .map(|a| {
            let value = response.get(&a.name).cloned().unwrap_or(Value::Null);
            let value = match (a.kind, value) {
                (AttrKind::ListNested, Value::Array(items)) if !a.nested.is_empty() => Value::Array(
                    items
                        .iter()
                        .map(|item| Value::Object(state_from_response(&a.nested, item)))
                        .collect(),
                ),
                (_, value) => value,
            };
            (a.name.clone(), value)
        })
        .collect()
}
