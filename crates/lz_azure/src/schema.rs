//! Resource types declared by the landing zone and their schemas.

use lz_core::{ResourceSchema, SchemaRegistry};

pub const RESOURCE_GROUP: &str = "azure-native:resources:ResourceGroup";
pub const VIRTUAL_NETWORK: &str = "azure-native:network:VirtualNetwork";
pub const SUBNET: &str = "azure-native:network:Subnet";
pub const PUBLIC_IP_ADDRESS: &str = "azure-native:network:PublicIPAddress";
pub const APPLICATION_GATEWAY: &str = "azure-native:network:ApplicationGateway";
pub const DNS_ZONE: &str = "azure-native:network:Zone";
pub const LOG_ANALYTICS_WORKSPACE: &str = "azure-native:operationalinsights:Workspace";
pub const MANAGED_GRAFANA: &str = "azure-native:dashboard:Grafana";
pub const USER_ASSIGNED_IDENTITY: &str = "azure-native:managedidentity:UserAssignedIdentity";
pub const ROLE_ASSIGNMENT: &str = "azure-native:authorization:RoleAssignment";
pub const MANAGED_CLUSTER: &str = "azure-native:containerservice:ManagedCluster";
pub const RANDOM_UUID: &str = "random:index:RandomUuid";
pub const KUBERNETES_PROVIDER: &str = "pulumi:providers:kubernetes";
pub const KUBERNETES_SECRET: &str = "kubernetes:core/v1:Secret";

/// Provider function returning the user kubeconfigs of a managed cluster.
pub const LIST_CLUSTER_USER_CREDENTIALS: &str =
    "azure-native:containerservice:listManagedClusterUserCredentials";

/// Schemas for every type in this module.
pub fn azure_schemas() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(ResourceSchema::new(RESOURCE_GROUP).require("location"))
        .with(
            ResourceSchema::new(VIRTUAL_NETWORK)
                .require("resourceGroupName")
                .require("addressSpace"),
        )
        .with(
            ResourceSchema::new(SUBNET)
                .require("resourceGroupName")
                .require("virtualNetworkName")
                .require("addressPrefix"),
        )
        .with(
            ResourceSchema::new(PUBLIC_IP_ADDRESS)
                .require("resourceGroupName")
                .require("sku")
                .output("ipAddress"),
        )
        .with(
            ResourceSchema::new(APPLICATION_GATEWAY)
                .require("resourceGroupName")
                .require("sku")
                .require("gatewayIPConfigurations"),
        )
        .with(
            ResourceSchema::new(DNS_ZONE)
                .require("resourceGroupName")
                .require("zoneName")
                .output("nameServers"),
        )
        .with(
            ResourceSchema::new(LOG_ANALYTICS_WORKSPACE)
                .require("resourceGroupName")
                .require("sku")
                .output("customerId"),
        )
        .with(
            ResourceSchema::new(MANAGED_GRAFANA)
                .require("resourceGroupName")
                .require("sku")
                .output("identity"),
        )
        .with(
            ResourceSchema::new(USER_ASSIGNED_IDENTITY)
                .require("resourceGroupName")
                .output("principalId")
                .output("clientId")
                .output("tenantId"),
        )
        .with(
            ResourceSchema::new(ROLE_ASSIGNMENT)
                .require("principalId")
                .require("roleDefinitionId")
                .require("roleAssignmentName")
                .require("scope"),
        )
        .with(
            ResourceSchema::new(MANAGED_CLUSTER)
                .require("resourceGroupName")
                .require("dnsPrefix")
                .require("agentPoolProfiles")
                .output("fqdn"),
        )
        .with(ResourceSchema::new(RANDOM_UUID).output("result"))
        .with(ResourceSchema::new(KUBERNETES_PROVIDER).require("kubeconfig"))
        .with(
            ResourceSchema::new(KUBERNETES_SECRET)
                .require("metadata")
                .require("stringData"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_registered() {
        let schemas = azure_schemas();
        for resource_type in [
            RESOURCE_GROUP,
            VIRTUAL_NETWORK,
            SUBNET,
            PUBLIC_IP_ADDRESS,
            APPLICATION_GATEWAY,
            DNS_ZONE,
            LOG_ANALYTICS_WORKSPACE,
            MANAGED_GRAFANA,
            USER_ASSIGNED_IDENTITY,
            ROLE_ASSIGNMENT,
            MANAGED_CLUSTER,
            RANDOM_UUID,
            KUBERNETES_PROVIDER,
            KUBERNETES_SECRET,
        ] {
            assert!(schemas.contains(resource_type), "{} not registered", resource_type);
        }
        assert_eq!(schemas.len(), 14);
    }

    #[test]
    fn test_identity_outputs() {
        let schemas = azure_schemas();
        let identity = schemas.get(USER_ASSIGNED_IDENTITY).unwrap();
        assert!(identity.outputs().contains(&"principalId".to_string()));
        assert!(identity.outputs().contains(&"clientId".to_string()));
    }
}
