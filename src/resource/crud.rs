//! Generic resource lifecycle
//!
//! Maps create/read/update/delete/import onto the REST API for any catalog
//! entry. Special behaviors (invitation responses, group memberships) are
//! switched on by flags in the resource definition.

use super::registry::{IdKind, ResourceDef};
use super::schema::{request_body, state_from_response, Schema};
use super::{id_to_string, Resource, State};
use crate::client::{ApiClient, GroupMembership};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use std::sync::Arc;

const GROUPS_ATTRIBUTE: &str = "groups";

/// Resource backed by a catalog definition
pub struct ApiResource {
    def: Arc<ResourceDef>,
}

impl ApiResource {
    pub fn new(def: Arc<ResourceDef>) -> Self {
        Self { def }
    }

    fn state_id(&self, state: &State) -> Result<String> {
        state
            .get("id")
            .and_then(id_to_string)
            .with_context(|| format!("{} ID is empty", self.def.display_name))
    }

    /// Fetch the entity and its group memberships, projected onto the schema
    async fn fetch(
        &self,
        client: &ApiClient,
        id: &str,
        prior: Option<&State>,
    ) -> Result<Option<State>> {
        let entity = match client.read(&self.def.entity_path(id)).await {
            Ok(entity) => entity,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read {} {}", self.def.display_name, id)
                })
            }
        };

        let mut state = state_from_response(&self.def.attributes, &entity);

        if self.def.has_groups {
            let groups = client
                .get_groups(&self.def.path, id)
                .await
                .with_context(|| {
                    format!("Failed to read groups of {} {}", self.def.display_name, id)
                })?;
            let prior_unset = prior
                .and_then(|p| p.get(GROUPS_ATTRIBUTE))
                .map_or(true, Value::is_null);
            let value = if groups.is_empty() && prior_unset {
                Value::Null
            } else {
                serde_json::to_value(groups)?
            };
            state.insert(GROUPS_ATTRIBUTE.to_string(), value);
        }

        // The POST response is never returned again; keep what we stored
        if let (Some(attr), Some(prior)) = (&self.def.post_response_attribute, prior) {
            if let Some(value) = prior.get(attr) {
                state.insert(attr.clone(), value.clone());
            }
        }

        Ok(Some(state))
    }

    /// Group memberships requested by the plan; `None` leaves them untouched
    fn planned_groups(&self, plan: &State) -> Result<Option<Vec<GroupMembership>>> {
        if !self.def.has_groups {
            return Ok(None);
        }
        let Some(value) = plan.get(GROUPS_ATTRIBUTE).filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        let groups = serde_json::from_value(value.clone())
            .with_context(|| format!("Invalid groups for {}", self.def.display_name))?;
        Ok(Some(groups))
    }

    async fn write_groups(
        &self,
        client: &ApiClient,
        id: &str,
        groups: Option<&[GroupMembership]>,
    ) -> Result<()> {
        let Some(groups) = groups else {
            return Ok(());
        };

        tracing::debug!(
            "Replacing {} group memberships of {} {}",
            groups.len(),
            self.def.name,
            id
        );
        client
            .replace_groups(&self.def.path, id, groups)
            .await
            .with_context(|| {
                format!("Failed to update groups of {} {}", self.def.display_name, id)
            })?;
        Ok(())
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        if id.is_empty() {
            bail!("{} ID is empty", self.def.display_name);
        }
        if self.def.id_kind == IdKind::Int64 && id.parse::<i64>().is_err() {
            bail!(
                "Invalid {} ID {:?}: expected an integer",
                self.def.display_name,
                id
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for ApiResource {
    fn type_name(&self) -> &str {
        &self.def.name
    }

    fn schema(&self) -> Schema {
        Schema::new(
            &format!("Manages a Blastshield {}.", self.def.display_name.to_lowercase()),
            self.def.attributes.clone(),
        )
    }

    async fn create(&self, client: &ApiClient, plan: &State) -> Result<State> {
        let schema = self.schema();
        let missing = schema.missing_required(plan);
        if !missing.is_empty() {
            bail!(
                "Missing required attributes for {}: {}",
                self.def.display_name,
                missing.join(", ")
            );
        }

        // Must fail before the POST
        let groups = self.planned_groups(plan)?;

        let body = Value::Object(request_body(&self.def.attributes, plan));
        tracing::info!("Creating {}", self.def.name);
        let response = client
            .create(&self.def.path, &body)
            .await
            .with_context(|| format!("Failed to create {}", self.def.display_name))?;

        let id = response
            .get(&self.def.post_id_field)
            .and_then(id_to_string)
            .with_context(|| {
                format!(
                    "Create {} response has no {:?} field",
                    self.def.display_name, self.def.post_id_field
                )
            })?;

        let mut carried = State::new();
        if self.def.store_post_response {
            if let Some(attr) = &self.def.post_response_attribute {
                let raw = serde_json::to_vec(&response)?;
                let encoded = base64::engine::general_purpose::STANDARD.encode(raw);
                carried.insert(attr.clone(), Value::String(encoded));
            }
        }
        if let Some(groups) = plan.get(GROUPS_ATTRIBUTE) {
            carried.insert(GROUPS_ATTRIBUTE.to_string(), groups.clone());
        }

        self.write_groups(client, &id, groups.as_deref()).await?;

        self.fetch(client, &id, Some(&carried))
            .await?
            .with_context(|| format!("{} {} disappeared after create", self.def.display_name, id))
    }

    async fn read(&self, client: &ApiClient, state: &State) -> Result<Option<State>> {
        let id = self.state_id(state)?;
        let refreshed = self.fetch(client, &id, Some(state)).await?;
        if refreshed.is_none() {
            tracing::warn!("{} {} not found, removing from state", self.def.display_name, id);
        }
        Ok(refreshed)
    }

    async fn update(&self, client: &ApiClient, prior: &State, plan: &State) -> Result<State> {
        let id = self.state_id(prior)?;
        let groups = self.planned_groups(plan)?;
        let body = Value::Object(request_body(&self.def.attributes, plan));

        tracing::info!("Updating {} {}", self.def.name, id);
        client
            .update(&self.def.entity_path(&id), &body)
            .await
            .with_context(|| format!("Failed to update {} {}", self.def.display_name, id))?;

        self.write_groups(client, &id, groups.as_deref()).await?;

        let mut carried = prior.clone();
        if let Some(groups) = plan.get(GROUPS_ATTRIBUTE) {
            carried.insert(GROUPS_ATTRIBUTE.to_string(), groups.clone());
        }
        self.fetch(client, &id, Some(&carried))
            .await?
            .with_context(|| format!("{} {} disappeared after update", self.def.display_name, id))
    }

    async fn delete(&self, client: &ApiClient, state: &State) -> Result<()> {
        let id = self.state_id(state)?;
        tracing::info!("Deleting {} {}", self.def.name, id);
        match client.delete(&self.def.entity_path(&id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::warn!("{} {} already deleted", self.def.display_name, id);
                Ok(())
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to delete {} {}", self.def.display_name, id)),
        }
    }

    async fn import(&self, client: &ApiClient, id: &str) -> Result<State> {
        self.validate_import_id(id)?;
        self.fetch(client, id, None)
            .await?
            .with_context(|| format!("Cannot import non-existent {} {}", self.def.display_name, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::Catalog;

    fn endpoint() -> ApiResource {
        let catalog = Catalog::from_json(include_str!("../resources/v1_13.json")).unwrap();
        ApiResource::new(Arc::new(catalog.get_resource("endpoint").unwrap().clone()))
    }

    #[test]
    fn test_import_id_validation() {
        let resource = endpoint();
        assert!(resource.validate_import_id("12").is_ok());
        assert!(resource.validate_import_id("").is_err());
        assert!(resource.validate_import_id("abc").is_err());
    }

    #[test]
    fn test_state_id_accepts_numbers_and_strings() {
        let resource = endpoint();
        let mut state = State::new();
        assert!(resource.state_id(&state).is_err());
        state.insert("id".into(), Value::from(5));
        assert_eq!(resource.state_id(&state).unwrap(), "5");
        state.insert("id".into(), Value::from("n-1"));
        assert_eq!(resource.state_id(&state).unwrap(), "n-1");
    }

    #[test]
    fn test_planned_groups() {
        let resource = endpoint();
        let plan: State = serde_json::from_value(serde_json::json!({
            "groups": [{"id": 2, "expires": null}, {"id": 3}]
        }))
        .unwrap();
        let groups = resource.planned_groups(&plan).unwrap().unwrap();
        assert_eq!(
            groups,
            vec![
                GroupMembership { id: 2, expires: 0 },
                GroupMembership { id: 3, expires: 0 }
            ]
        );

        assert!(resource.planned_groups(&State::new()).unwrap().is_none());

        let bad: State =
            serde_json::from_value(serde_json::json!({"groups": [{"id": "x"}]})).unwrap();
        assert!(resource.planned_groups(&bad).is_err());
    }

    #[test]
    fn test_schema_description() {
        let schema = endpoint().schema();
        assert_eq!(schema.description, "Manages a Blastshield endpoint.");
        assert!(schema.attribute("groups").unwrap().skip_body);
    }
}
