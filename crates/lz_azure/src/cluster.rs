//! Managed Kubernetes cluster.

use lz_core::{
    DeclarationError, Deferred, NameContext, Properties, Resource, ResourceKind, ResourceOptions,
    Stack,
};
use tracing::{debug, info};

use crate::config::LandingZoneConfig;
use crate::credentials::cluster_kubeconfig;
use crate::gateway::Gateway;
use crate::monitoring::Monitoring;
use crate::network::Network;
use crate::schema::MANAGED_CLUSTER;

/// Subnet tag the system node pool is placed into.
pub const CLUSTER_SUBNET_TAG: &str = "aks";

#[derive(Debug, Clone)]
pub struct Cluster {
    pub cluster: Resource,
    /// Decoded user kubeconfig; secret.
    pub kubeconfig: Deferred<String>,
}

impl Cluster {
    pub fn name(&self) -> Deferred<String> {
        self.cluster.remote_name()
    }

    pub fn id(&self) -> Deferred<String> {
        self.cluster.id()
    }
}

fn system_pool(config: &LandingZoneConfig, subnet_id: Option<Deferred<String>>) -> Properties {
    Properties::new()
        .set("availabilityZones", vec!["1", "2", "3"])
        .set("count", config.num_worker_nodes)
        .set("enableNodePublicIP", false)
        .set("mode", "System")
        .set("name", "systempool")
        .set("osType", "Linux")
        .set("osDiskSizeGB", 30u32)
        .set("type", "VirtualMachineScaleSets")
        .set("vmSize", config.node_vm_size.as_str())
        .set_opt("vnetSubnetID", subnet_id)
}

fn addon_profiles(monitoring: &Monitoring, gateway: Option<&Gateway>) -> Properties {
    let oms_agent = Properties::new().set("enabled", true).set(
        "config",
        Properties::new().set("logAnalyticsWorkspaceResourceID", monitoring.workspace_id()),
    );
    let ingress = gateway.map(|gateway| {
        Properties::new().set("enabled", true).set(
            "config",
            Properties::new().set("applicationGatewayId", gateway.id()),
        )
    });
    Properties::new()
        .set("omsagent", oms_agent)
        .set_opt("ingressApplicationGateway", ingress)
}

pub fn declare_cluster(
    stack: &mut Stack,
    config: &LandingZoneConfig,
    names: &NameContext,
    network: &Network,
    monitoring: &Monitoring,
    gateway: Option<&Gateway>,
) -> Result<Cluster, DeclarationError> {
    let subnet_id = match network.subnets.select(CLUSTER_SUBNET_TAG) {
        Ok(id) => Some(id),
        Err(not_found) => {
            debug!("Node pool keeps the default subnet: {}", not_found);
            None
        }
    };
    let group_name = network.resource_group_name();

    let properties = Properties::new()
        .set("resourceGroupName", &group_name)
        .set("location", config.location.as_str())
        .set(
            "aadProfile",
            Properties::new()
                .set("enableAzureRBAC", true)
                .set("managed", true)
                .set("adminGroupObjectIDs", vec![config.admin_group_id.as_str()]),
        )
        .set("addonProfiles", addon_profiles(monitoring, gateway))
        .set("agentPoolProfiles", vec![system_pool(config, subnet_id)])
        .set(
            "apiServerAccessProfile",
            Properties::new()
                .set("authorizedIPRanges", vec!["0.0.0.0/0"])
                .set("enablePrivateCluster", false),
        )
        .set("dnsPrefix", config.dns_prefix.as_str())
        .set("enableRBAC", true)
        .set("identity", Properties::new().set("type", "SystemAssigned"))
        .set("kubernetesVersion", config.kubernetes_version.as_str())
        .set(
            "linuxProfile",
            Properties::new().set("adminUsername", "azureuser").set(
                "ssh",
                Properties::new().set(
                    "publicKeys",
                    vec![Properties::new().set("keyData", config.ssh_public_key.as_str())],
                ),
            ),
        )
        .set(
            "networkProfile",
            Properties::new()
                .set("networkPlugin", "azure")
                .set("networkPolicy", "azure")
                .set("serviceCidr", "10.96.0.0/16")
                .set("dnsServiceIP", "10.96.0.10"),
        );

    let cluster = stack.declare(
        MANAGED_CLUSTER,
        names.derive(&ResourceKind::KubernetesCluster)?,
        properties,
        ResourceOptions::new(),
    )?;
    let kubeconfig = cluster_kubeconfig(stack, &group_name, &cluster.remote_name());

    info!(
        "Declared cluster {} (ingress gateway: {})",
        cluster.name(),
        gateway.is_some()
    );
    Ok(Cluster {
        cluster,
        kubeconfig,
    })
}
