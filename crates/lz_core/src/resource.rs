//! Resource descriptors, property bags and per-type schemas.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt, TryFutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::deferred::{Deferred, DeferredItem, Resolution};
use crate::error::{DeclarationError, ResolutionFailure};

/// Output properties reported by the backend for one resource.
pub type Outputs = BTreeMap<String, Value>;

/// A property value: a literal, a deferred value, or a nesting of both.
#[derive(Clone)]
pub enum Input {
    Literal(Value),
    Deferred(Deferred<Value>),
    List(Vec<Input>),
    Object(BTreeMap<String, Input>),
}

impl Input {
    pub fn list<I: Into<Input>>(items: impl IntoIterator<Item = I>) -> Self {
        Input::List(items.into_iter().map(Into::into).collect())
    }

    /// Descriptors any deferred value inside this input was derived from.
    pub fn collect_sources(&self, out: &mut BTreeSet<String>) {
        match self {
            Input::Literal(_) => {}
            Input::Deferred(value) => out.extend(value.source_set().iter().cloned()),
            Input::List(items) => items.iter().for_each(|i| i.collect_sources(out)),
            Input::Object(map) => map.values().for_each(|i| i.collect_sources(out)),
        }
    }

    pub fn is_secret(&self) -> bool {
        match self {
            Input::Literal(_) => false,
            Input::Deferred(value) => value.is_secret(),
            Input::List(items) => items.iter().any(Input::is_secret),
            Input::Object(map) => map.values().any(Input::is_secret),
        }
    }

    /// Future resolving every nested deferred value into plain JSON.
    pub(crate) fn resolve(&self) -> BoxFuture<'static, Resolution<Value>> {
        match self {
            Input::Literal(value) => future::ready(Ok(value.clone())).boxed(),
            Input::Deferred(value) => value.shared().boxed(),
            Input::List(items) => {
                let pending: Vec<_> = items.iter().map(Input::resolve).collect();
                future::try_join_all(pending).map_ok(Value::Array).boxed()
            }
            Input::Object(map) => {
                let keys: Vec<String> = map.keys().cloned().collect();
                let pending: Vec<_> = map.values().map(Input::resolve).collect();
                future::try_join_all(pending)
                    .map_ok(move |values| Value::Object(keys.into_iter().zip(values).collect()))
                    .boxed()
            }
        }
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Literal(value)
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Input::Literal(Value::from(value))
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Input::Literal(Value::from(value))
    }
}

impl From<bool> for Input {
    fn from(value: bool) -> Self {
        Input::Literal(Value::from(value))
    }
}

impl From<i64> for Input {
    fn from(value: i64) -> Self {
        Input::Literal(Value::from(value))
    }
}

impl From<u32> for Input {
    fn from(value: u32) -> Self {
        Input::Literal(Value::from(value))
    }
}

impl<T: DeferredItem + Serialize> From<Deferred<T>> for Input {
    fn from(value: Deferred<T>) -> Self {
        Input::Deferred(value.try_map(|v| {
            serde_json::to_value(v).map_err(|e| ResolutionFailure::Transform(e.to_string()))
        }))
    }
}

impl<T: DeferredItem + Serialize> From<&Deferred<T>> for Input {
    fn from(value: &Deferred<T>) -> Self {
        Input::from(value.clone())
    }
}

impl<I: Into<Input>> From<Vec<I>> for Input {
    fn from(items: Vec<I>) -> Self {
        Input::list(items)
    }
}

impl From<Properties> for Input {
    fn from(properties: Properties) -> Self {
        Input::Object(properties.0)
    }
}

/// Property bag of a resource descriptor.
#[derive(Clone, Default)]
pub struct Properties(BTreeMap<String, Input>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, builder style.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Input>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Set a property only when a value is present.
    pub fn set_opt<V: Into<Input>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Input>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Input> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every descriptor the deferred values in this bag originate from.
    pub fn sources(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for input in self.0.values() {
            input.collect_sources(&mut out);
        }
        out
    }

    /// Resolve the whole bag into a JSON object map.
    pub(crate) fn resolve(&self) -> BoxFuture<'static, Resolution<Outputs>> {
        let keys: Vec<String> = self.0.keys().cloned().collect();
        let pending: Vec<_> = self.0.values().map(Input::resolve).collect();
        future::try_join_all(pending)
            .map_ok(move |values| keys.into_iter().zip(values).collect())
            .boxed()
    }
}

/// Deletion-ordering hint passed through to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionPolicy {
    /// Delete the old resource before creating its replacement.
    DeleteBeforeReplace,
    /// Leave the remote resource in place when the descriptor disappears.
    Retain,
}

/// Optional settings for a declaration.
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    pub(crate) depends_on: Vec<String>,
    pub(crate) deletion: Option<DeletionPolicy>,
    pub(crate) secret_outputs: Vec<String>,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order after `resource` without consuming any of its outputs.
    pub fn depends_on(mut self, resource: &Resource) -> Self {
        self.depends_on.push(resource.name().to_string());
        self
    }

    pub fn depends_on_name(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn delete_before_replace(mut self) -> Self {
        self.deletion = Some(DeletionPolicy::DeleteBeforeReplace);
        self
    }

    pub fn retain_on_delete(mut self) -> Self {
        self.deletion = Some(DeletionPolicy::Retain);
        self
    }

    /// Treat the named output as sensitive.
    pub fn secret_output(mut self, output: impl Into<String>) -> Self {
        self.secret_outputs.push(output.into());
        self
    }
}

/// Required inputs and produced outputs of one resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSchema {
    resource_type: String,
    required: Vec<String>,
    outputs: Vec<String>,
}

impl ResourceSchema {
    /// New schema; every resource produces `id` and `name`.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            required: Vec::new(),
            outputs: vec!["id".to_string(), "name".to_string()],
        }
    }

    pub fn require(mut self, property: impl Into<String>) -> Self {
        self.required.push(property.into());
        self
    }

    pub fn output(mut self, output: impl Into<String>) -> Self {
        let output = output.into();
        if !self.outputs.contains(&output) {
            self.outputs.push(output);
        }
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// First required property missing from `properties`.
    pub fn missing_property(&self, properties: &Properties) -> Option<&str> {
        self.required
            .iter()
            .find(|p| !properties.contains(p.as_str()))
            .map(|p| p.as_str())
    }
}

/// Registry of resource schemas keyed by type tag.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, ResourceSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Register a schema, replacing any schema for the same type.
    pub fn register(&mut self, schema: ResourceSchema) {
        debug!("Registering schema: {}", schema.resource_type);
        self.schemas.insert(schema.resource_type.clone(), schema);
    }

    pub fn with(mut self, schema: ResourceSchema) -> Self {
        self.register(schema);
        self
    }

    pub fn get(&self, resource_type: &str) -> Option<&ResourceSchema> {
        self.schemas.get(resource_type)
    }

    pub fn get_required(&self, resource_type: &str) -> Result<&ResourceSchema, DeclarationError> {
        self.get(resource_type)
            .ok_or_else(|| DeclarationError::UnknownType(resource_type.to_string()))
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.schemas.contains_key(resource_type)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Immutable declaration of a desired remote resource.
#[derive(Clone)]
pub struct ResourceDescriptor {
    pub(crate) name: String,
    pub(crate) resource_type: String,
    pub(crate) properties: Properties,
    pub(crate) dependencies: BTreeSet<String>,
    pub(crate) explicit_dependencies: BTreeSet<String>,
    pub(crate) deletion: Option<DeletionPolicy>,
    pub(crate) expected_outputs: Vec<String>,
}

impl ResourceDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Inferred and explicit dependencies together.
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn explicit_dependencies(&self) -> &BTreeSet<String> {
        &self.explicit_dependencies
    }

    pub fn deletion(&self) -> Option<DeletionPolicy> {
        self.deletion
    }

    pub fn expected_outputs(&self) -> &[String] {
        &self.expected_outputs
    }

    pub fn depends_on(&self, other: &str) -> bool {
        self.dependencies.contains(other)
    }
}

impl std::fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("name", &self.name)
            .field("resource_type", &self.resource_type)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Handle to a declared resource, exposing its outputs as deferred values.
#[derive(Clone)]
pub struct Resource {
    name: String,
    resource_type: String,
    outputs: Deferred<Arc<Outputs>>,
    secret_outputs: Arc<BTreeSet<String>>,
}

impl Resource {
    pub(crate) fn new(
        name: String,
        resource_type: String,
        outputs: Deferred<Arc<Outputs>>,
        secret_outputs: BTreeSet<String>,
    ) -> Self {
        Self {
            name,
            resource_type,
            outputs,
            secret_outputs: Arc::new(secret_outputs),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// All outputs once the backend applied the resource.
    pub fn outputs(&self) -> &Deferred<Arc<Outputs>> {
        &self.outputs
    }

    /// A single output property.
    pub fn output(&self, key: &str) -> Deferred<Value> {
        let resource = self.name.clone();
        let output = key.to_string();
        let value = self.outputs.try_map(move |outputs| {
            outputs
                .get(&output)
                .cloned()
                .ok_or(ResolutionFailure::MissingOutput { resource, output })
        });
        if self.secret_outputs.contains(key) {
            value.secret()
        } else {
            value
        }
    }

    /// A single string output property.
    pub fn output_str(&self, key: &str) -> Deferred<String> {
        let resource = self.name.clone();
        let output = key.to_string();
        self.output(key).try_map(move |value| match value {
            Value::String(s) => Ok(s),
            other => Err(ResolutionFailure::Transform(format!(
                "output `{}` of `{}` is not a string: {}",
                output, resource, other
            ))),
        })
    }

    /// The provider-assigned identifier.
    pub fn id(&self) -> Deferred<String> {
        self.output_str("id")
    }

    /// The remote name of the resource.
    pub fn remote_name(&self) -> Deferred<String> {
        self.output_str("name")
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("resource_type", &self.resource_type)
            .finish()
    }
}
