//! # lz_core
//!
//! Deferred-value composition core for landing-zone provisioning.
//!
//! A provisioning program declares resources whose properties (ids,
//! credentials, addresses) only exist after a remote system creates them.
//! This crate lets the program wire those not-yet-known values into further
//! declarations immediately, and derives the dependency graph from that wiring.
//!
//! # Architecture
//!
//! - **Deferred**: an asynchronously available value with `map` / `combine`
//! - **Stack**: the graph of resource descriptors, invokes and exports
//! - **Conditional sub-graphs**: `build_if` for optional features
//! - **Naming / SubnetTable**: deterministic names and subnet lookup by tag
//! - **Deployer**: drives the graph against a `ProvisioningBackend`
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lz_core::{
//!     Deployer, Properties, ResourceOptions, ResourceSchema, SchemaRegistry,
//!     SimulatedBackend, Stack,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schemas = SchemaRegistry::new()
//!         .with(ResourceSchema::new("azure-native:resources:ResourceGroup"))
//!         .with(ResourceSchema::new("azure-native:network:VirtualNetwork").require("resourceGroupName"));
//!
//!     let mut stack = Stack::new("dev", schemas);
//!     let group = stack.declare(
//!         "azure-native:resources:ResourceGroup",
//!         "rg-aks-weu-dev",
//!         Properties::new(),
//!         ResourceOptions::new(),
//!     )?;
//!     stack.declare(
//!         "azure-native:network:VirtualNetwork",
//!         "vnet-aks-weu-dev",
//!         Properties::new().set("resourceGroupName", group.remote_name()),
//!         ResourceOptions::new(),
//!     )?;
//!
//!     let deployer = Deployer::new(Arc::new(SimulatedBackend::default()));
//!     let report = deployer.resolve_all(stack).await;
//!     println!("{} applied", report.succeeded().len());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod conditional;
pub mod deferred;
pub mod deployer;
pub mod error;
pub mod naming;
pub mod report;
pub mod resource;
pub mod stack;
pub mod subnet;

// Re-export main types for convenience
pub use backend::{ApplyRequest, CapturedCall, ProvisioningBackend, SimulatedBackend};
pub use conditional::SubGraph;
pub use deferred::{combine, Deferred, DeferredItem, Resolution};
pub use deployer::Deployer;
pub use error::{
    BackendError, CoreError, CoreResult, DeclarationError, NotFound, ResolutionFailure,
};
pub use naming::{NameContext, ResourceKind};
pub use report::{DeploymentReport, ExportValue, ReportSummary, ResourceOutcome, ResourceReport};
pub use resource::{
    DeletionPolicy, Input, Outputs, Properties, Resource, ResourceDescriptor, ResourceOptions,
    ResourceSchema, SchemaRegistry,
};
pub use stack::Stack;
pub use subnet::{SubnetEntry, SubnetSpec, SubnetTable};
