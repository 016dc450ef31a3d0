//! The deployment graph.
//!
//! A [`Stack`] records every resource descriptor a program declares, the
//! backend functions it invokes, and the values it exports. Declaring is
//! synchronous and never provisions anything: each declaration returns a
//! [`Resource`] whose outputs resolve once the [`Deployer`](crate::Deployer)
//! applies the descriptor.
//!
//! Dependency edges are plain data. Any deferred value placed into a property
//! bag contributes its sources to the descriptor's dependency set, and
//! [`ResourceOptions::depends_on`] adds ordering-only edges.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::channel::oneshot;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::deferred::{Deferred, DeferredItem, Resolution};
use crate::error::{DeclarationError, ResolutionFailure};
use crate::resource::{
    Outputs, Properties, Resource, ResourceDescriptor, ResourceOptions, SchemaRegistry,
};

pub(crate) type ApplySender = oneshot::Sender<Resolution<Arc<Outputs>>>;

/// A declared resource awaiting application.
pub(crate) struct PendingApply {
    pub(crate) descriptor: ResourceDescriptor,
    pub(crate) sender: ApplySender,
}

/// A backend function call awaiting its arguments.
pub(crate) struct PendingInvoke {
    pub(crate) function: String,
    pub(crate) args: Properties,
    pub(crate) sender: oneshot::Sender<Resolution<Value>>,
}

/// A named value published by the deployment.
pub(crate) struct Export {
    pub(crate) name: String,
    pub(crate) value: Deferred<Value>,
}

/// Graph of resource declarations for one deployment pass.
pub struct Stack {
    name: String,
    schemas: SchemaRegistry,
    pending: Vec<PendingApply>,
    handles: Vec<Resource>,
    index: HashMap<String, usize>,
    invokes: Vec<PendingInvoke>,
    exports: Vec<Export>,
}

impl Stack {
    /// Create an empty stack whose declarations are checked against `schemas`.
    pub fn new(name: impl Into<String>, schemas: SchemaRegistry) -> Self {
        Self {
            name: name.into(),
            schemas,
            pending: Vec::new(),
            handles: Vec::new(),
            index: HashMap::new(),
            invokes: Vec::new(),
            exports: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Declare a resource.
    ///
    /// Returns immediately with a handle whose outputs are deferred. Fails when
    /// the name is already taken, the type has no schema, a required property is
    /// absent, or an explicit dependency was never declared.
    pub fn declare(
        &mut self,
        resource_type: &str,
        name: impl Into<String>,
        properties: Properties,
        options: ResourceOptions,
    ) -> Result<Resource, DeclarationError> {
        let name = name.into();

        if let Some(existing) = self.get(&name) {
            return Err(DeclarationError::DuplicateName {
                name,
                existing_type: existing.resource_type().to_string(),
                requested_type: resource_type.to_string(),
            });
        }

        let schema = self.schemas.get_required(resource_type)?;
        if let Some(property) = schema.missing_property(&properties) {
            return Err(DeclarationError::MissingProperty {
                name,
                resource_type: resource_type.to_string(),
                property: property.to_string(),
            });
        }
        let expected_outputs = schema.outputs().to_vec();

        let mut explicit_dependencies = BTreeSet::new();
        for dependency in options.depends_on {
            if !self.index.contains_key(&dependency) {
                return Err(DeclarationError::UnknownDependency { name, dependency });
            }
            explicit_dependencies.insert(dependency);
        }

        let inferred = properties.sources();
        if let Some(dependency) = inferred.iter().find(|d| !self.index.contains_key(*d)) {
            return Err(DeclarationError::UnknownDependency {
                name,
                dependency: dependency.clone(),
            });
        }

        let mut dependencies = inferred;
        dependencies.extend(explicit_dependencies.iter().cloned());

        let (sender, receiver) = oneshot::channel();
        let unapplied = name.clone();
        let outputs = Deferred::from_resource(&name, async move {
            match receiver.await {
                Ok(resolution) => resolution,
                Err(_) => Err(ResolutionFailure::NotApplied(unapplied)),
            }
        });

        let handle = Resource::new(
            name.clone(),
            resource_type.to_string(),
            outputs,
            options.secret_outputs.into_iter().collect(),
        );

        debug!(
            "Declared {} `{}` ({} dependencies)",
            resource_type,
            name,
            dependencies.len()
        );

        let descriptor = ResourceDescriptor {
            name: name.clone(),
            resource_type: resource_type.to_string(),
            properties,
            dependencies,
            explicit_dependencies,
            deletion: options.deletion,
            expected_outputs,
        };

        self.index.insert(name, self.pending.len());
        self.pending.push(PendingApply { descriptor, sender });
        self.handles.push(handle.clone());
        Ok(handle)
    }

    /// Call a backend function once its arguments resolve.
    ///
    /// The result carries the sources of the arguments, so a resource consuming
    /// it is ordered after everything the call itself waited for.
    pub fn invoke(&mut self, function: impl Into<String>, args: Properties) -> Deferred<Value> {
        let function = function.into();
        let sources = args.sources();
        let (sender, receiver) = oneshot::channel();
        let unresolved = function.clone();
        let result = Deferred::from_future(async move {
            match receiver.await {
                Ok(resolution) => resolution,
                Err(_) => Err(ResolutionFailure::Invoke {
                    function: unresolved,
                    message: "never invoked".to_string(),
                }),
            }
        })
        .with_sources(&sources);

        debug!("Registered invoke `{}`", function);
        self.invokes.push(PendingInvoke {
            function,
            args,
            sender,
        });
        result
    }

    /// Publish a value under `name` in the deployment report.
    pub fn export<T: DeferredItem + Serialize>(
        &mut self,
        name: impl Into<String>,
        value: &Deferred<T>,
    ) -> Result<(), DeclarationError> {
        let name = name.into();
        if self.exports.iter().any(|e| e.name == name) {
            return Err(DeclarationError::DuplicateExport(name));
        }
        let value = value.try_map(|v| {
            serde_json::to_value(v).map_err(|e| ResolutionFailure::Transform(e.to_string()))
        });
        self.exports.push(Export { name, value });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.index.get(name).map(|&i| &self.pending[i].descriptor)
    }

    /// Handle of a declared resource.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.index.get(name).map(|&i| &self.handles[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptors in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.pending.iter().map(|p| &p.descriptor)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().map(|e| e.name.as_str())
    }

    pub fn invoke_count(&self) -> usize {
        self.invokes.len()
    }

    pub fn dependencies_of(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.get(name).map(|d| d.dependencies())
    }

    /// Descriptors that directly depend on `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.descriptors()
            .filter(|d| d.depends_on(name))
            .map(|d| d.name())
            .collect()
    }

    /// Group descriptors into waves that may apply concurrently.
    ///
    /// Every descriptor lands one wave after its latest dependency. Dependencies
    /// always precede their dependents in declaration order, so a single pass
    /// suffices.
    pub fn apply_waves(&self) -> Vec<Vec<&str>> {
        let mut wave_of: HashMap<&str, usize> = HashMap::new();
        let mut waves: Vec<Vec<&str>> = Vec::new();

        for descriptor in self.descriptors() {
            let wave = descriptor
                .dependencies()
                .iter()
                .filter_map(|d| wave_of.get(d.as_str()))
                .map(|w| w + 1)
                .max()
                .unwrap_or(0);
            wave_of.insert(descriptor.name(), wave);
            if waves.len() <= wave {
                waves.resize_with(wave + 1, Vec::new);
            }
            waves[wave].push(descriptor.name());
        }

        waves
    }

    /// Descriptor names in an order that respects every dependency edge.
    pub fn topological_order(&self) -> Vec<&str> {
        self.apply_waves().into_iter().flatten().collect()
    }

    /// Number of descriptors declared so far; used to delimit sub-graphs.
    pub(crate) fn mark(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn names_since(&self, mark: usize) -> Vec<String> {
        self.pending[mark..]
            .iter()
            .map(|p| p.descriptor.name.clone())
            .collect()
    }

    pub(crate) fn into_parts(self) -> StackParts {
        info!(
            "Stack `{}`: {} resources, {} invokes, {} exports",
            self.name,
            self.pending.len(),
            self.invokes.len(),
            self.exports.len()
        );
        StackParts {
            name: self.name,
            pending: self.pending,
            handles: self.handles,
            invokes: self.invokes,
            exports: self.exports,
        }
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("name", &self.name)
            .field("resources", &self.descriptors().map(|d| d.name()).collect::<Vec<_>>())
            .field("exports", &self.export_names().collect::<Vec<_>>())
            .finish()
    }
}

pub(crate) struct StackParts {
    pub(crate) name: String,
    pub(crate) pending: Vec<PendingApply>,
    pub(crate) handles: Vec<Resource>,
    pub(crate) invokes: Vec<PendingInvoke>,
    pub(crate) exports: Vec<Export>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceSchema;

    fn schemas() -> SchemaRegistry {
        SchemaRegistry::new()
            .with(ResourceSchema::new("test:res:Group"))
            .with(
                ResourceSchema::new("test:net:Network")
                    .require("resourceGroupName")
                    .require("addressPrefixes"),
            )
            .with(
                ResourceSchema::new("test:net:Subnet")
                    .require("virtualNetworkName")
                    .require("addressPrefix"),
            )
            .with(ResourceSchema::new("test:feature:Registration"))
    }

    fn network_stack() -> Stack {
        let mut stack = Stack::new("dev", schemas());
        let group = stack
            .declare("test:res:Group", "rg", Properties::new(), ResourceOptions::new())
            .unwrap();
        let network = stack
            .declare(
                "test:net:Network",
                "vnet",
                Properties::new()
                    .set("resourceGroupName", group.remote_name())
                    .set("addressPrefixes", vec!["10.0.0.0/16"]),
                ResourceOptions::new(),
            )
            .unwrap();
        stack
            .declare(
                "test:net:Subnet",
                "snet-aks",
                Properties::new()
                    .set("virtualNetworkName", network.remote_name())
                    .set("resourceGroupName", group.remote_name())
                    .set("addressPrefix", "10.0.1.0/24"),
                ResourceOptions::new(),
            )
            .unwrap();
        stack
    }

    #[test]
    fn test_declare_infers_dependencies() {
        let stack = network_stack();

        assert_eq!(stack.len(), 3);
        assert!(stack.dependencies_of("rg").unwrap().is_empty());
        assert!(stack.get("vnet").unwrap().depends_on("rg"));

        let subnet_deps: Vec<&String> = stack.dependencies_of("snet-aks").unwrap().iter().collect();
        assert_eq!(subnet_deps, vec!["rg", "vnet"]);
        assert_eq!(stack.dependents_of("rg"), vec!["vnet", "snet-aks"]);
    }

    #[test]
    fn test_declare_rejects_duplicate_name() {
        let mut stack = network_stack();
        let err = stack
            .declare("test:res:Group", "vnet", Properties::new(), ResourceOptions::new())
            .unwrap_err();

        assert_eq!(
            err,
            DeclarationError::DuplicateName {
                name: "vnet".to_string(),
                existing_type: "test:net:Network".to_string(),
                requested_type: "test:res:Group".to_string(),
            }
        );
    }

    #[test]
    fn test_declare_rejects_missing_property() {
        let mut stack = Stack::new("dev", schemas());
        let err = stack
            .declare(
                "test:net:Subnet",
                "snet",
                Properties::new().set("addressPrefix", "10.0.0.0/24"),
                ResourceOptions::new(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            DeclarationError::MissingProperty { ref property, .. } if property == "virtualNetworkName"
        ));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_declare_rejects_unknown_type_and_dependency() {
        let mut stack = Stack::new("dev", schemas());
        assert_eq!(
            stack
                .declare("test:unknown:Thing", "x", Properties::new(), ResourceOptions::new())
                .unwrap_err(),
            DeclarationError::UnknownType("test:unknown:Thing".to_string())
        );

        let err = stack
            .declare(
                "test:res:Group",
                "rg",
                Properties::new(),
                ResourceOptions::new().depends_on_name("feature"),
            )
            .unwrap_err();
        assert!(matches!(err, DeclarationError::UnknownDependency { .. }));
    }

    #[test]
    fn test_explicit_dependency_without_data_edge() {
        let mut stack = Stack::new("dev", schemas());
        let feature = stack
            .declare(
                "test:feature:Registration",
                "feature",
                Properties::new(),
                ResourceOptions::new(),
            )
            .unwrap();
        stack
            .declare(
                "test:res:Group",
                "rg",
                Properties::new(),
                ResourceOptions::new().depends_on(&feature).retain_on_delete(),
            )
            .unwrap();

        let group = stack.get("rg").unwrap();
        assert!(group.depends_on("feature"));
        assert!(group.explicit_dependencies().contains("feature"));
        assert!(group.properties().sources().is_empty());
    }

    #[test]
    fn test_apply_waves() {
        let mut stack = network_stack();
        stack
            .declare("test:res:Group", "rg-shared", Properties::new(), ResourceOptions::new())
            .unwrap();

        let waves = stack.apply_waves();
        assert_eq!(waves, vec![vec!["rg", "rg-shared"], vec!["vnet"], vec!["snet-aks"]]);
        assert_eq!(
            stack.topological_order(),
            vec!["rg", "rg-shared", "vnet", "snet-aks"]
        );
    }

    #[test]
    fn test_invoke_carries_argument_sources() {
        let mut stack = network_stack();
        let network = stack.resource("vnet").unwrap().clone();
        let result = stack.invoke(
            "test:net:listKeys",
            Properties::new().set("networkName", network.remote_name()),
        );

        assert_eq!(result.sources().collect::<Vec<_>>(), vec!["vnet"]);
        assert_eq!(stack.invoke_count(), 1);
    }

    #[test]
    fn test_duplicate_export_rejected() {
        let mut stack = network_stack();
        let id = stack.resource("vnet").unwrap().id();
        stack.export("networkId", &id).unwrap();
        assert_eq!(
            stack.export("networkId", &id).unwrap_err(),
            DeclarationError::DuplicateExport("networkId".to_string())
        );
    }
}
