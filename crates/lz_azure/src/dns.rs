//! Public DNS zone and the external-dns integration.

use lz_core::naming::derive;
use lz_core::{
    DeclarationError, Deferred, NameContext, Properties, Resource, ResourceKind, ResourceOptions,
    Stack,
};
use serde_json::json;
use tracing::info;

use crate::identity::{bind, IdentityBinding};
use crate::monitoring::subscription_scope;
use crate::network::Network;
use crate::roles::RoleCatalog;
use crate::schema::{DNS_ZONE, KUBERNETES_PROVIDER, KUBERNETES_SECRET};

pub const EXTERNAL_DNS_APP: &str = "externaldns";
pub const EXTERNAL_DNS_NAMESPACE: &str = "external-dns";
pub const EXTERNAL_DNS_SECRET_NAME: &str = "azure-config-file";
pub const DNS_ZONE_ROLE: &str = "DNS Zone Contributor";

#[derive(Debug, Clone)]
pub struct DnsIntegration {
    pub zone: Resource,
    pub identity: IdentityBinding,
    /// `azure.json` consumed by external-dns.
    pub azure_json: Deferred<String>,
    pub provider: Resource,
    pub secret: Resource,
}

impl DnsIntegration {
    pub fn zone_id(&self) -> Deferred<String> {
        self.zone.id()
    }
}

/// Render the external-dns `azure.json` document.
pub fn azure_json(
    tenant_id: &str,
    subscription_id: &str,
    resource_group: &str,
    client_id: &str,
) -> String {
    json!({
        "tenantId": tenant_id,
        "subscriptionId": subscription_id,
        "resourceGroup": resource_group,
        "useManagedIdentityExtension": true,
        "userAssignedIdentityID": client_id,
    })
    .to_string()
}

pub fn declare_dns(
    stack: &mut Stack,
    catalog: &dyn RoleCatalog,
    names: &NameContext,
    zone_name: &str,
    network: &Network,
    kubeconfig: &Deferred<String>,
) -> Result<DnsIntegration, DeclarationError> {
    let group_name = network.resource_group_name();

    let zone = stack.declare(
        DNS_ZONE,
        zone_name,
        Properties::new()
            .set("zoneName", zone_name)
            .set("resourceGroupName", &group_name)
            .set("zoneType", "Public")
            .set("location", "global"),
        ResourceOptions::new(),
    )?;

    let identity_name = derive(
        &ResourceKind::ManagedIdentity,
        EXTERNAL_DNS_APP,
        names.location_short(),
        names.env_short(),
    )?;
    let identity = bind(
        stack,
        catalog,
        &identity_name,
        &group_name,
        DNS_ZONE_ROLE,
        zone.id(),
    )?;

    let subscription_id = network
        .resource_group_id()
        .map(|id| subscription_scope(&id).trim_start_matches("/subscriptions/").to_string());
    let document = Deferred::all([
        identity.tenant_id(),
        subscription_id,
        group_name.clone(),
        identity.client_id(),
    ])
    .map(|parts| azure_json(&parts[0], &parts[1], &parts[2], &parts[3]));

    let provider = stack.declare(
        KUBERNETES_PROVIDER,
        format!("k8s-{}", names.derive(&ResourceKind::KubernetesCluster)?),
        Properties::new().set("kubeconfig", kubeconfig),
        ResourceOptions::new(),
    )?;

    let secret = stack.declare(
        KUBERNETES_SECRET,
        "external-dns-azure-config",
        Properties::new()
            .set(
                "metadata",
                Properties::new()
                    .set("name", EXTERNAL_DNS_SECRET_NAME)
                    .set("namespace", EXTERNAL_DNS_NAMESPACE),
            )
            .set("type", "Opaque")
            .set("stringData", Properties::new().set("azure.json", &document)),
        ResourceOptions::new()
            .depends_on(&provider)
            .delete_before_replace(),
    )?;

    info!("Declared DNS zone {} with external-dns identity {}", zone_name, identity_name);
    Ok(DnsIntegration {
        zone,
        identity,
        azure_json: document,
        provider,
        secret,
    })
}
