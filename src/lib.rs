//! Blastshield Terraform provider
//!
//! Exposes Blastshield nodes, endpoints, groups, services, policies, egress
//! policies, proxies, event-log rules and settings as declarative resources
//! and data sources over the Blastshield REST API.
//!
//! The REST surface differs between API releases, so each supported API
//! version contributes its own implementation. At startup the dispatcher asks
//! the server which version it runs and picks the highest implementation not
//! exceeding it.
//!
//! ```ignore
//! use blastshield_provider::{dispatch, versions, Provider};
//!
//! async fn start() -> anyhow::Result<Provider> {
//!     let registry = versions::Registry::new();
//!     versions::register_all(&registry)?;
//!     let selection =
//!         dispatch::detect_version(&registry, dispatch::Credentials::from_env().as_ref()).await?;
//!     Ok(Provider::new("dev", selection.implementation))
//! }
//! ```

pub mod client;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod provider;
pub mod resource;
pub mod version;
pub mod versions;

pub use provider::Provider;

/// Version injected at compile time via BLASTSHIELD_PROVIDER_VERSION (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("BLASTSHIELD_PROVIDER_VERSION") {
    Some(v) => v,
    None => "dev",
};
