//! # lz_azure
//!
//! Azure landing zone built on the `lz_core` deferred graph.
//!
//! # Architecture
//!
//! - **Config**: stack file loading and validation
//! - **Network**: resource group, virtual network and tagged subnets
//! - **Monitoring**: Log Analytics workspace and managed Grafana
//! - **Identity / Roles**: managed identities and role assignments
//! - **Gateway**: ingress application gateway, only with an `agw` subnet
//! - **Cluster**: managed Kubernetes cluster and its kubeconfig
//! - **DNS**: public zone and external-dns wiring, only with a zone name
//! - **Program**: the whole landing zone in one call
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use lz_azure::{landing_zone_stack, simulated_backend, BuiltInRoleCatalog, LandingZone, LandingZoneConfig};
//! use lz_core::Deployer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(LandingZoneConfig::from_file("dev", Path::new("Pulumi.dev.yaml"))?);
//!     let catalog = BuiltInRoleCatalog::new(config.subscription_id.clone());
//!
//!     let mut stack = landing_zone_stack(&config);
//!     LandingZone::declare(&mut stack, config.clone(), &catalog)?;
//!
//!     let deployer = Deployer::new(Arc::new(simulated_backend(&config)));
//!     let report = deployer.resolve_all(stack).await;
//!     println!("{:?}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod cluster;
pub mod config;
pub mod credentials;
pub mod dns;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod monitoring;
pub mod network;
pub mod program;
pub mod roles;
pub mod schema;
pub mod simulation;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use cluster::Cluster;
pub use config::{LandingZoneConfig, RawConfig};
pub use dns::DnsIntegration;
pub use error::{ConfigError, ZoneError, ZoneResult};
pub use gateway::{Gateway, GatewayNames};
pub use identity::{IdentityBinding, PrincipalType, RoleAssignmentArgs};
pub use monitoring::Monitoring;
pub use network::Network;
pub use program::{landing_zone_stack, LandingZone};
pub use roles::{BuiltInRoleCatalog, RoleCatalog};
pub use schema::azure_schemas;
pub use simulation::simulated_backend;
