//! The outermost driver of a deployment pass.
//!
//! [`Deployer::resolve_all`] is the single point where deferred values are
//! awaited. It drives one future per descriptor, per invoke and per export on
//! the caller's task; the backend is the only place where work may actually
//! run in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::{ApplyRequest, ProvisioningBackend};
use crate::deferred::Deferred;
use crate::error::ResolutionFailure;
use crate::report::{DeploymentReport, ExportValue, ResourceOutcome, ResourceReport};
use crate::resource::Outputs;
use crate::stack::{Export, PendingApply, PendingInvoke, Stack};

/// Applies a [`Stack`] against a provisioning backend.
pub struct Deployer {
    backend: Arc<dyn ProvisioningBackend>,
}

impl Deployer {
    pub fn new(backend: Arc<dyn ProvisioningBackend>) -> Self {
        Self { backend }
    }

    /// Drive every descriptor, invoke and export of `stack` to a terminal state.
    ///
    /// A descriptor is applied only after every dependency applied and every
    /// property resolved. When one fails, the descriptors consuming it are
    /// skipped and independent branches carry on.
    pub async fn resolve_all(&self, stack: Stack) -> DeploymentReport {
        let started_at = Utc::now();
        let deployment_id = Uuid::new_v4();
        let parts = stack.into_parts();
        info!("Starting deployment {} of stack `{}`", deployment_id, parts.name);

        let outputs_by_name: HashMap<&str, &Deferred<Arc<Outputs>>> = parts
            .handles
            .iter()
            .map(|h| (h.name(), h.outputs()))
            .collect();

        let applies: Vec<_> = parts
            .pending
            .into_iter()
            .map(|pending| {
                let dependencies = pending
                    .descriptor
                    .dependencies
                    .iter()
                    .filter_map(|d| outputs_by_name.get(d.as_str()).map(|o| (*o).clone()))
                    .collect();
                self.apply_one(pending, dependencies)
            })
            .collect();
        let invokes: Vec<_> = parts
            .invokes
            .into_iter()
            .map(|invoke| self.invoke_one(invoke))
            .collect();
        let exports: Vec<_> = parts.exports.into_iter().map(resolve_export).collect();

        let (resources, _, exports) =
            futures::join!(join_all(applies), join_all(invokes), join_all(exports));

        let report = DeploymentReport {
            deployment_id,
            stack: parts.name,
            started_at,
            completed_at: Utc::now(),
            resources,
            exports: exports.into_iter().collect(),
        };

        let summary = report.summary();
        if report.is_success() {
            info!(
                "Deployment {} completed: {} resources applied",
                deployment_id, summary.succeeded
            );
        } else {
            warn!(
                "Deployment {} finished with failures: {} succeeded, {} failed, {} skipped",
                deployment_id, summary.succeeded, summary.failed, summary.skipped
            );
        }
        report
    }

    async fn apply_one(
        &self,
        pending: PendingApply,
        dependencies: Vec<Deferred<Arc<Outputs>>>,
    ) -> ResourceReport {
        let PendingApply { descriptor, sender } = pending;
        let mut report = ResourceReport {
            name: descriptor.name.clone(),
            resource_type: descriptor.resource_type.clone(),
            outcome: ResourceOutcome::Succeeded,
        };

        let settled = join_all(dependencies.iter().map(|d| d.resolve())).await;
        let properties = match settled.into_iter().find_map(Result::err) {
            Some(failure) => Err(failure),
            None => descriptor.properties.resolve().await,
        };

        let properties = match properties {
            Ok(properties) => properties,
            Err(cause) => {
                let upstream = cause.origin().map(str::to_string);
                warn!("Skipping `{}`: {}", descriptor.name, cause);
                report.outcome = ResourceOutcome::Skipped {
                    upstream,
                    reason: cause.to_string(),
                };
                let _ = sender.send(Err(ResolutionFailure::Upstream {
                    resource: descriptor.name,
                    cause: Box::new(cause),
                }));
                return report;
            }
        };

        let request = ApplyRequest {
            name: descriptor.name.clone(),
            resource_type: descriptor.resource_type.clone(),
            properties,
            dependencies: descriptor.dependencies.clone(),
            deletion: descriptor.deletion,
            expected_outputs: descriptor.expected_outputs.clone(),
        };

        debug!("Applying {} `{}`", request.resource_type, request.name);
        match self.backend.apply(&request).await {
            Ok(outputs) => {
                info!("Applied `{}`", request.name);
                let _ = sender.send(Ok(Arc::new(outputs)));
            }
            Err(e) => {
                error!("Failed to apply `{}`: {}", request.name, e);
                report.outcome = ResourceOutcome::Failed {
                    message: e.to_string(),
                };
                let _ = sender.send(Err(ResolutionFailure::Apply {
                    resource: request.name,
                    message: e.to_string(),
                }));
            }
        }
        report
    }

    async fn invoke_one(&self, invoke: PendingInvoke) {
        let PendingInvoke {
            function,
            args,
            sender,
        } = invoke;

        let result = match args.resolve().await {
            Ok(args) => {
                debug!("Invoking `{}`", function);
                self.backend
                    .invoke(&function, &Value::Object(args.into_iter().collect()))
                    .await
                    .map_err(|e| {
                        error!("Invoke `{}` failed: {}", function, e);
                        ResolutionFailure::Invoke {
                            function: function.clone(),
                            message: e.to_string(),
                        }
                    })
            }
            Err(cause) => {
                warn!("Skipping invoke `{}`: {}", function, cause);
                Err(cause)
            }
        };
        let _ = sender.send(result);
    }
}

async fn resolve_export(export: Export) -> (String, ExportValue) {
    let value = match export.value.resolve().await {
        Ok(_) if export.value.is_secret() => ExportValue::Secret,
        Ok(value) => ExportValue::Resolved { value },
        Err(failure) => ExportValue::Failed {
            reason: failure.to_string(),
        },
    };
    (export.name, value)
}

impl std::fmt::Debug for Deployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedBackend;
    use crate::resource::{Properties, ResourceOptions, ResourceSchema, SchemaRegistry};
    use serde_json::json;

    fn schemas() -> SchemaRegistry {
        SchemaRegistry::new()
            .with(ResourceSchema::new("test:res:Group"))
            .with(ResourceSchema::new("test:net:Network").require("resourceGroupName"))
            .with(ResourceSchema::new("test:id:Identity").output("principalId"))
    }

    #[tokio::test]
    async fn test_resolve_all_applies_in_dependency_order() {
        let backend = SimulatedBackend::new("sub");
        let mut stack = Stack::new("dev", schemas());
        let group = stack
            .declare("test:res:Group", "rg", Properties::new(), ResourceOptions::new())
            .unwrap();
        let network = stack
            .declare(
                "test:net:Network",
                "vnet",
                Properties::new().set("resourceGroupName", group.remote_name()),
                ResourceOptions::new(),
            )
            .unwrap();
        stack.export("networkName", &network.remote_name()).unwrap();

        let report = Deployer::new(Arc::new(backend.clone()))
            .resolve_all(stack)
            .await;

        assert!(report.is_success());
        assert_eq!(backend.applied_names(), vec!["rg", "vnet"]);
        assert_eq!(
            backend.get_method_calls("apply")[1].payload,
            json!({"resourceGroupName": "rg"})
        );
        assert_eq!(
            report.export("networkName"),
            Some(&ExportValue::Resolved {
                value: json!("vnet")
            })
        );
        assert_eq!(network.remote_name().peek(), Some(Ok("vnet".to_string())));
    }

    #[tokio::test]
    async fn test_secret_exports_are_redacted() {
        let mut stack = Stack::new("dev", schemas());
        let identity = stack
            .declare(
                "test:id:Identity",
                "id",
                Properties::new(),
                ResourceOptions::new().secret_output("principalId"),
            )
            .unwrap();
        stack.export("principal", &identity.output("principalId")).unwrap();

        let report = Deployer::new(Arc::new(SimulatedBackend::default()))
            .resolve_all(stack)
            .await;
        assert_eq!(report.export("principal"), Some(&ExportValue::Secret));
    }

    #[tokio::test]
    async fn test_invoke_runs_after_arguments() {
        let backend = SimulatedBackend::default()
            .with_invoke("test:fn:upper", |args| {
                let name = args["name"].as_str().unwrap_or_default();
                Ok(json!(name.to_uppercase()))
            });
        let mut stack = Stack::new("dev", schemas());
        let group = stack
            .declare("test:res:Group", "rg", Properties::new(), ResourceOptions::new())
            .unwrap();
        let upper = stack.invoke("test:fn:upper", Properties::new().set("name", group.remote_name()));
        stack.export("upper", &upper).unwrap();

        let report = Deployer::new(Arc::new(backend.clone())).resolve_all(stack).await;

        assert_eq!(
            report.export("upper"),
            Some(&ExportValue::Resolved { value: json!("RG") })
        );
        let methods: Vec<String> = backend.get_calls().into_iter().map(|c| c.method).collect();
        assert_eq!(methods, vec!["apply", "invoke"]);
    }

    #[tokio::test]
    async fn test_failed_invoke_skips_consumer() {
        let mut stack = Stack::new("dev", schemas());
        let group = stack
            .declare("test:res:Group", "rg", Properties::new(), ResourceOptions::new())
            .unwrap();
        let missing = stack.invoke("test:fn:missing", Properties::new().set("rg", group.id()));
        stack
            .declare(
                "test:net:Network",
                "vnet",
                Properties::new()
                    .set("resourceGroupName", group.remote_name())
                    .set("tags", missing),
                ResourceOptions::new(),
            )
            .unwrap();

        let report = Deployer::new(Arc::new(SimulatedBackend::default()))
            .resolve_all(stack)
            .await;

        assert_eq!(report.succeeded(), vec!["rg"]);
        assert!(matches!(
            report.outcome_of("vnet"),
            Some(ResourceOutcome::Skipped { upstream: Some(u), .. }) if u == "test:fn:missing"
        ));
    }

    #[tokio::test]
    async fn test_missing_output_is_not_reported_as_failed_upstream() {
        let backend = SimulatedBackend::new("sub");
        let mut stack = Stack::new("dev", schemas());
        let group = stack
            .declare("test:res:Group", "rg", Properties::new(), ResourceOptions::new())
            .unwrap();
        stack
            .declare(
                "test:net:Network",
                "vnet",
                Properties::new().set("resourceGroupName", group.output_str("location")),
                ResourceOptions::new(),
            )
            .unwrap();

        let report = Deployer::new(Arc::new(backend.clone()))
            .resolve_all(stack)
            .await;

        assert_eq!(report.outcome_of("rg"), Some(&ResourceOutcome::Succeeded));
        assert!(matches!(
            report.outcome_of("vnet"),
            Some(ResourceOutcome::Skipped { upstream: None, reason }) if reason.contains("location")
        ));
        assert!(!backend.was_applied("vnet"));
    }
}
