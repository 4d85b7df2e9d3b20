//! API 1.13.x
//!
//! Every taggable object accepts `tags`.

use super::{CatalogProvider, Registry};
use anyhow::Result;
use std::sync::Arc;

pub const API_VERSION: &str = "1.13.0";

const CATALOG: &str = include_str!("../resources/v1_13.json");

pub fn register(registry: &Registry) -> Result<()> {
    let provider = CatalogProvider::from_json(API_VERSION, CATALOG)?;
    registry.register(API_VERSION, Arc::new(provider));
    Ok(())
}
