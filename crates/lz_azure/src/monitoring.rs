//! Log Analytics workspace and Managed Grafana.

use lz_core::{
    DeclarationError, Deferred, NameContext, Properties, Resource, ResourceKind, ResourceOptions,
    ResolutionFailure, Stack,
};
use serde_json::Value;

use crate::config::LandingZoneConfig;
use crate::identity::{assign_role, PrincipalType, RoleAssignmentArgs};
use crate::roles::RoleCatalog;
use crate::schema::{LOG_ANALYTICS_WORKSPACE, MANAGED_GRAFANA};

pub const WORKSPACE_RETENTION_DAYS: u32 = 30;
pub const WORKSPACE_SKU: &str = "PerGB2018";

#[derive(Debug, Clone)]
pub struct Monitoring {
    pub workspace: Resource,
    pub grafana: Resource,
    /// Monitoring Reader for Grafana's own identity; empty if not granted.
    pub reader_assignment_id: Deferred<String>,
    /// Grafana Admin for the admin group; empty if not granted.
    pub admin_assignment_id: Deferred<String>,
}

impl Monitoring {
    pub fn workspace_id(&self) -> Deferred<String> {
        self.workspace.id()
    }

    /// Principal of Grafana's system-assigned identity.
    pub fn grafana_principal_id(&self) -> Deferred<String> {
        principal_of(&self.grafana)
    }
}

fn principal_of(resource: &Resource) -> Deferred<String> {
    let name = resource.name().to_string();
    resource.output("identity").try_map(move |identity| {
        identity
            .get("principalId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ResolutionFailure::MissingOutput {
                resource: name,
                output: "identity.principalId".to_string(),
            })
    })
}

/// `/subscriptions/{id}` of the subscription a resource id lives in.
pub fn subscription_scope(resource_id: &str) -> String {
    format!(
        "/subscriptions/{}",
        resource_id.split('/').nth(2).unwrap_or_default()
    )
}

pub fn declare_monitoring(
    stack: &mut Stack,
    catalog: &dyn RoleCatalog,
    config: &LandingZoneConfig,
    names: &NameContext,
    resource_group_name: &Deferred<String>,
) -> Result<Monitoring, DeclarationError> {
    let workspace = stack.declare(
        LOG_ANALYTICS_WORKSPACE,
        names.derive(&ResourceKind::LogAnalyticsWorkspace)?,
        Properties::new()
            .set("resourceGroupName", resource_group_name)
            .set("location", config.location.as_str())
            .set("retentionInDays", WORKSPACE_RETENTION_DAYS)
            .set("sku", Properties::new().set("name", WORKSPACE_SKU)),
        ResourceOptions::new(),
    )?;

    let grafana = stack.declare(
        MANAGED_GRAFANA,
        names.derive(&ResourceKind::ManagedGrafana)?,
        Properties::new()
            .set("resourceGroupName", resource_group_name)
            .set("location", config.location.as_str())
            .set("identity", Properties::new().set("type", "SystemAssigned"))
            .set(
                "properties",
                Properties::new()
                    .set("apiKey", "Enabled")
                    .set("deterministicOutboundIP", "Enabled")
                    .set("publicNetworkAccess", "Enabled")
                    .set("zoneRedundancy", "Enabled"),
            )
            .set("sku", Properties::new().set("name", "Standard")),
        ResourceOptions::new(),
    )?;

    let subscription = grafana.id().map(|id| subscription_scope(&id));
    let reader_assignment_id = assign_role(
        stack,
        catalog,
        "GrafanaIdentity",
        RoleAssignmentArgs::new(
            "Monitoring Reader",
            principal_of(&grafana),
            PrincipalType::ServicePrincipal,
            subscription,
        ),
    )?;

    let admin_assignment_id = assign_role(
        stack,
        catalog,
        "GrafanaAdmin",
        RoleAssignmentArgs::new(
            "Grafana Admin",
            config.admin_group_id.as_str(),
            PrincipalType::Group,
            grafana.id(),
        ),
    )?;

    Ok(Monitoring {
        workspace,
        grafana,
        reader_assignment_id,
        admin_assignment_id,
    })
}
