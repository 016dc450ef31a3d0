//! Provisioning backend seam.
//!
//! The deployer hands each descriptor to a [`ProvisioningBackend`] once all
//! of its inputs are known. The backend owns the remote side: creating the
//! resource, diffing against existing state, timeouts.

mod simulated;

pub use simulated::{CapturedCall, SimulatedBackend};

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BackendError;
use crate::resource::{DeletionPolicy, Outputs};

/// A descriptor with every property resolved to plain JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRequest {
    pub name: String,
    pub resource_type: String,
    pub properties: Outputs,
    pub dependencies: BTreeSet<String>,
    pub deletion: Option<DeletionPolicy>,
    pub expected_outputs: Vec<String>,
}

impl ApplyRequest {
    /// A string property, if present.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// Remote provisioning engine.
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Create or update one resource and report its outputs.
    async fn apply(&self, request: &ApplyRequest) -> Result<Outputs, BackendError>;

    /// Call a provider function.
    async fn invoke(&self, function: &str, args: &Value) -> Result<Value, BackendError>;
}
