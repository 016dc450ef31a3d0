//! In-memory provisioning backend.
//!
//! Synthesizes plausible outputs for every applied descriptor so a whole
//! landing zone can be driven without a cloud account. Used by the `lz` binary
//! and by tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ApplyRequest, ProvisioningBackend};
use crate::error::BackendError;
use crate::resource::Outputs;

type InvokeHandler = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: String,
    pub target: String,
    pub payload: Value,
    pub at: DateTime<Utc>,
}

/// Simulated provisioning backend.
#[derive(Clone)]
pub struct SimulatedBackend {
    subscription_id: String,
    /// Descriptor names whose apply is rejected, with the rejection message.
    failures: Arc<RwLock<HashMap<String, String>>>,
    /// Outputs merged into every resource of a type.
    type_outputs: Arc<RwLock<HashMap<String, Outputs>>>,
    /// Outputs merged into one named resource.
    name_outputs: Arc<RwLock<HashMap<String, Outputs>>>,
    invoke_handlers: Arc<RwLock<HashMap<String, InvokeHandler>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new("00000000-0000-0000-0000-000000000000")
    }
}

impl SimulatedBackend {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            failures: Arc::new(RwLock::new(HashMap::new())),
            type_outputs: Arc::new(RwLock::new(HashMap::new())),
            name_outputs: Arc::new(RwLock::new(HashMap::new())),
            invoke_handlers: Arc::new(RwLock::new(HashMap::new())),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Reject the apply of the named descriptor.
    pub fn fail_resource(self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.write().insert(name.into(), message.into());
        self
    }

    /// Merge fixed outputs into every resource of `resource_type`.
    pub fn with_type_outputs(self, resource_type: impl Into<String>, outputs: Outputs) -> Self {
        self.type_outputs.write().insert(resource_type.into(), outputs);
        self
    }

    /// Merge fixed outputs into the named resource.
    pub fn with_outputs(self, name: impl Into<String>, outputs: Outputs) -> Self {
        self.name_outputs.write().insert(name.into(), outputs);
        self
    }

    /// Answer invokes of `function` with `handler`.
    pub fn with_invoke<F>(self, function: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.invoke_handlers
            .write()
            .insert(function.into(), Arc::new(handler));
        self
    }

    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Number of apply calls received.
    pub fn apply_count(&self) -> usize {
        self.get_method_calls("apply").len()
    }

    /// Whether an apply for `name` was received, successful or not.
    pub fn was_applied(&self, name: &str) -> bool {
        self.captured_calls
            .read()
            .iter()
            .any(|c| c.method == "apply" && c.target == name)
    }

    /// Applied descriptor names in the order the backend saw them.
    pub fn applied_names(&self) -> Vec<String> {
        self.get_method_calls("apply")
            .into_iter()
            .map(|c| c.target)
            .collect()
    }

    fn record_call(&self, method: &str, target: &str, payload: Value) {
        self.captured_calls.write().push(CapturedCall {
            method: method.to_string(),
            target: target.to_string(),
            payload,
            at: Utc::now(),
        });
    }

    /// Provider-style identifier built from the type tag and resource group.
    fn resource_id(&self, request: &ApplyRequest) -> String {
        let mut parts = request.resource_type.split(':');
        let _provider = parts.next();
        let module = parts.next().unwrap_or("resources");
        let kind = parts.next().unwrap_or("Resource");

        if kind == "ResourceGroup" {
            return format!(
                "/subscriptions/{}/resourceGroups/{}",
                self.subscription_id, request.name
            );
        }

        let namespace = format!("Microsoft.{}", capitalize(module));
        let collection = format!("{}s", lower_first(kind));
        match request.property_str("resourceGroupName") {
            Some(group) => format!(
                "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
                self.subscription_id, group, namespace, collection, request.name
            ),
            None => format!(
                "/subscriptions/{}/providers/{}/{}/{}",
                self.subscription_id, namespace, collection, request.name
            ),
        }
    }

    fn synthesize(&self, request: &ApplyRequest) -> Outputs {
        let mut outputs = request.properties.clone();
        outputs.insert("id".to_string(), Value::from(self.resource_id(request)));
        outputs
            .entry("name".to_string())
            .or_insert_with(|| Value::from(request.name.clone()));

        if let Some(fixed) = self.type_outputs.read().get(&request.resource_type) {
            outputs.extend(fixed.clone());
        }
        if let Some(fixed) = self.name_outputs.read().get(&request.name) {
            outputs.extend(fixed.clone());
        }

        let present: HashSet<String> = outputs.keys().cloned().collect();
        for output in &request.expected_outputs {
            if !present.contains(output) {
                outputs.insert(output.clone(), Value::from(Uuid::new_v4().to_string()));
            }
        }
        outputs
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl ProvisioningBackend for SimulatedBackend {
    async fn apply(&self, request: &ApplyRequest) -> Result<Outputs, BackendError> {
        self.record_call(
            "apply",
            &request.name,
            Value::Object(request.properties.clone().into_iter().collect()),
        );

        if let Some(message) = self.failures.read().get(&request.name) {
            warn!("Simulated failure for `{}`: {}", request.name, message);
            return Err(BackendError::Rejected(message.clone()));
        }

        let outputs = self.synthesize(request);
        debug!("Simulated apply of {} `{}`", request.resource_type, request.name);
        Ok(outputs)
    }

    async fn invoke(&self, function: &str, args: &Value) -> Result<Value, BackendError> {
        self.record_call("invoke", function, args.clone());

        let handler = self.invoke_handlers.read().get(function).cloned();
        match handler {
            Some(handler) => handler(args).map_err(BackendError::Rejected),
            None => Err(BackendError::UnknownFunction(function.to_string())),
        }
    }
}
