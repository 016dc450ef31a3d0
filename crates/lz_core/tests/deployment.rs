//! End-to-end deployment passes against the simulated backend.

use std::sync::Arc;

use lz_core::{
    combine, Deployer, ExportValue, Properties, ResolutionFailure, ResourceOptions,
    ResourceOutcome, ResourceSchema, SchemaRegistry, SimulatedBackend, Stack,
};
use serde_json::json;

fn schemas() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(ResourceSchema::new("test:res:Group"))
        .with(ResourceSchema::new("test:net:Network").require("resourceGroupName"))
        .with(
            ResourceSchema::new("test:net:Subnet")
                .require("virtualNetworkName")
                .require("addressPrefix"),
        )
        .with(ResourceSchema::new("test:monitor:Workspace").require("resourceGroupName"))
}

#[tokio::test]
async fn failed_upstream_skips_dependents_only() {
    let backend = SimulatedBackend::new("sub").fail_resource("vnet", "address space overlaps");
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
    let subnet = stack
        .declare(
            "test:net:Subnet",
            "snet-aks",
            Properties::new()
                .set("virtualNetworkName", network.remote_name())
                .set("addressPrefix", "10.0.1.0/24"),
            ResourceOptions::new(),
        )
        .unwrap();
    stack
        .declare(
            "test:monitor:Workspace",
            "law",
            Properties::new().set("resourceGroupName", group.remote_name()),
            ResourceOptions::new(),
        )
        .unwrap();
    stack.export("subnetId", &subnet.id()).unwrap();
    stack.export("groupName", &group.remote_name()).unwrap();

    let report = Deployer::new(Arc::new(backend.clone()))
        .resolve_all(stack)
        .await;

    // The subnet's producer never reached the backend.
    assert!(backend.was_applied("vnet"));
    assert!(!backend.was_applied("snet-aks"));
    assert!(backend.was_applied("law"));

    assert_eq!(report.succeeded(), vec!["rg", "law"]);
    assert_eq!(report.failed(), vec!["vnet"]);
    assert_eq!(report.skipped(), vec!["snet-aks"]);
    assert!(matches!(
        report.outcome_of("snet-aks"),
        Some(ResourceOutcome::Skipped { upstream: Some(u), .. }) if u == "vnet"
    ));
    assert!(matches!(report.export("subnetId"), Some(ExportValue::Failed { .. })));
    assert_eq!(
        report.export("groupName"),
        Some(&ExportValue::Resolved { value: json!("rg") })
    );

    match subnet.id().resolve().await {
        Err(ResolutionFailure::Upstream { resource, cause }) => {
            assert_eq!(resource, "snet-aks");
            assert_eq!(cause.origin(), Some("vnet"));
        }
        other => panic!("unexpected subnet resolution: {:?}", other),
    }
}

#[tokio::test]
async fn explicit_dependency_orders_apply() {
    let backend = SimulatedBackend::default();
    let mut stack = Stack::new("dev", schemas());

    let first = stack
        .declare("test:res:Group", "rg-feature", Properties::new(), ResourceOptions::new())
        .unwrap();
    stack
        .declare(
            "test:res:Group",
            "rg-app",
            Properties::new(),
            ResourceOptions::new().depends_on(&first),
        )
        .unwrap();

    let report = Deployer::new(Arc::new(backend.clone()))
        .resolve_all(stack)
        .await;

    assert!(report.is_success());
    assert_eq!(backend.applied_names(), vec!["rg-feature", "rg-app"]);
}

#[tokio::test]
async fn failed_explicit_dependency_skips_without_data_edge() {
    let backend = SimulatedBackend::default().fail_resource("rg-feature", "not registered");
    let mut stack = Stack::new("dev", schemas());

    let feature = stack
        .declare("test:res:Group", "rg-feature", Properties::new(), ResourceOptions::new())
        .unwrap();
    stack
        .declare(
            "test:res:Group",
            "rg-app",
            Properties::new(),
            ResourceOptions::new().depends_on(&feature),
        )
        .unwrap();

    let report = Deployer::new(Arc::new(backend.clone()))
        .resolve_all(stack)
        .await;

    assert_eq!(report.skipped(), vec!["rg-app"]);
    assert!(!backend.was_applied("rg-app"));
}

#[tokio::test]
async fn combined_values_flow_into_properties() {
    let backend = SimulatedBackend::new("sub-42");
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
    let scope = combine(&group.id(), &network.remote_name(), |id, name| {
        format!("{}/networks/{}", id, name)
    });
    stack.export("scope", &scope).unwrap();

    let report = Deployer::new(Arc::new(backend)).resolve_all(stack).await;

    assert_eq!(
        report.export("scope"),
        Some(&ExportValue::Resolved {
            value: json!("/subscriptions/sub-42/resourceGroups/rg/networks/vnet")
        })
    );
}

#[tokio::test]
async fn unresolved_stack_fails_handles() {
    let mut stack = Stack::new("dev", schemas());
    let group = stack
        .declare("test:res:Group", "rg", Properties::new(), ResourceOptions::new())
        .unwrap();
    drop(stack);

    assert_eq!(
        group.id().resolve().await,
        Err(ResolutionFailure::NotApplied("rg".to_string()))
    );
}
