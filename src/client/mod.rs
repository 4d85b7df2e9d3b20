//! Blastshield API client
//!
//! Generic CRUD operations over the REST API. Every resource goes through the
//! same five verbs; paths come from the resource catalogs.
//!
//! # Module Structure
//!
//! - [`http`] - HTTP transport, error type and log sanitizing
//!
//! # Example
//!
//! ```ignore
//! use blastshield_provider::client::ApiClient;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = ApiClient::new("https://bs.example.com", "token")?;
//!     let nodes = client.list("/nodes/", &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod http;

pub use http::ApiError;

use http::HttpClient;
use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Timeout applied to every CRUD request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Query filter for list endpoints; repeated values become repeated parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFilter {
    pub param: String,
    pub values: Vec<String>,
}

impl ResourceFilter {
    pub fn new(param: &str, values: Vec<String>) -> Self {
        Self {
            param: param.to_string(),
            values,
        }
    }
}

/// Group membership with optional expiry; 0 means no expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub expires: i64,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

#[derive(Debug, Serialize)]
struct GroupList<'a> {
    op: &'a str,
    groups: &'a [GroupMembership],
}

/// Main API client
#[derive(Clone)]
pub struct ApiClient {
    host: String,
    token: String,
    http: HttpClient,
}

impl ApiClient {
    /// Create a new client; a trailing slash on `host` is ignored
    pub fn new(host: &str, token: &str) -> Result<Self, ApiError> {
        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http: HttpClient::new(REQUEST_TIMEOUT)?,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build an absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    /// POST a new entity
    pub async fn create(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.http
            .send(Method::POST, &self.url(path), &self.token, Some(body))
            .await
    }

    /// GET a single entity
    pub async fn read(&self, path: &str) -> Result<Value, ApiError> {
        self.http
            .send(Method::GET, &self.url(path), &self.token, None)
            .await
    }

    /// PUT an updated entity
    pub async fn update(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.http
            .send(Method::PUT, &self.url(path), &self.token, Some(body))
            .await
    }

    /// DELETE an entity
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.http
            .send(Method::DELETE, &self.url(path), &self.token, None)
            .await
            .map(|_| ())
    }

    /// DELETE with a JSON body
    pub async fn delete_with_body(&self, path: &str, body: &Value) -> Result<(), ApiError> {
        self.http
            .send(Method::DELETE, &self.url(path), &self.token, Some(body))
            .await
            .map(|_| ())
    }

    /// GET a collection, applying query filters
    pub async fn list(
        &self,
        path: &str,
        filters: &[ResourceFilter],
    ) -> Result<Vec<Value>, ApiError> {
        let url = self.list_url(path, filters)?;
        let response = self.http.send(Method::GET, &url, &self.token, None).await?;
        match response {
            Value::Null => Ok(Vec::new()),
            other => Ok(serde_json::from_value(other)?),
        }
    }

    fn list_url(&self, path: &str, filters: &[ResourceFilter]) -> Result<String, ApiError> {
        let raw = self.url(path);
        if filters.iter().all(|f| f.values.is_empty()) {
            return Ok(raw);
        }
        let mut url = url::Url::parse(&raw).map_err(|source| ApiError::Url {
            url: raw.clone(),
            source,
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            for filter in filters {
                for value in &filter.values {
                    pairs.append_pair(&filter.param, value);
                }
            }
        }
        Ok(url.into())
    }

    /// Get group memberships of an entity
    pub async fn get_groups(
        &self,
        base_path: &str,
        id: &str,
    ) -> Result<Vec<GroupMembership>, ApiError> {
        if id.is_empty() {
            return Err(ApiError::EmptyId(base_path.trim_matches('/').to_string()));
        }
        let response = self.read(&format!("{}{}/groups", base_path, id)).await?;
        match response {
            Value::Null => Ok(Vec::new()),
            other => Ok(serde_json::from_value(other)?),
        }
    }

    /// Replace group memberships of an entity
    pub async fn replace_groups(
        &self,
        base_path: &str,
        id: &str,
        groups: &[GroupMembership],
    ) -> Result<Vec<GroupMembership>, ApiError> {
        if id.is_empty() {
            return Err(ApiError::EmptyId(base_path.trim_matches('/').to_string()));
        }
        let body = serde_json::to_value(GroupList {
            op: "replace",
            groups,
        })?;
        let response = self
            .update(&format!("{}{}/groups", base_path, id), &body)
            .await?;
        match response {
            Value::Null => Ok(groups.to_vec()),
            other => Ok(serde_json::from_value(other)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:4999/", "dev").unwrap();
        assert_eq!(client.host(), "http://localhost:4999");
        assert_eq!(client.url("/nodes/"), "http://localhost:4999/nodes/");
    }

    #[test]
    fn test_list_url_without_filters() {
        let client = ApiClient::new("http://localhost:4999", "dev").unwrap();
        let url = client
            .list_url("/groups/", &[ResourceFilter::new("name", vec![])])
            .unwrap();
        assert_eq!(url, "http://localhost:4999/groups/");
    }

    #[test]
    fn test_list_url_repeats_params() {
        let client = ApiClient::new("http://localhost:4999", "dev").unwrap();
        let url = client
            .list_url(
                "/groups/",
                &[ResourceFilter::new("name", vec!["a b".into(), "c".into()])],
            )
            .unwrap();
        assert_eq!(url, "http://localhost:4999/groups/?name=a+b&name=c");
    }

    #[test]
    fn test_group_membership_expiry_defaults_to_zero() {
        let groups: Vec<GroupMembership> = serde_json::from_value(serde_json::json!([
            {"id": 1},
            {"id": 2, "expires": null},
            {"id": 3, "expires": 1700000000}
        ]))
        .unwrap();
        let expires: Vec<_> = groups.iter().map(|g| g.expires).collect();
        assert_eq!(expires, vec![0, 0, 1700000000]);
    }
}
