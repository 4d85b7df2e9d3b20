//! API 1.12.x
//!
//! Endpoints, policies, egress policies and proxies do not carry tags.

use super::{CatalogProvider, Registry};
use anyhow::Result;
use std::sync::Arc;

pub const API_VERSION: &str = "1.12.0";

const CATALOG: &str = include_str!("../resources/v1_12.json");

pub fn register(registry: &Registry) -> Result<()> {
    let provider = CatalogProvider::from_json(API_VERSION, CATALOG)?;
    registry.register(API_VERSION, Arc::new(provider));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_resources() {
        let provider = CatalogProvider::from_json(API_VERSION, CATALOG).unwrap();
        for key in ["endpoint", "policy", "egresspolicy", "proxy"] {
            let def = provider.catalog().get_resource(key).unwrap();
            assert!(def.attribute("tags").is_none(), "{} should not have tags", key);
        }
        for key in ["node", "group", "service", "eventlogrule"] {
            let def = provider.catalog().get_resource(key).unwrap();
            assert!(def.attribute("tags").is_some(), "{} should have tags", key);
        }
    }
}
