//! The landing zone program: wires every component into one stack.

use std::sync::Arc;

use lz_core::Stack;
use tracing::info;

use crate::cluster::{declare_cluster, Cluster};
use crate::config::LandingZoneConfig;
use crate::dns::{declare_dns, DnsIntegration};
use crate::error::ZoneResult;
use crate::gateway::{declare_gateway, Gateway, GATEWAY_SUBNET_TAG};
use crate::monitoring::{declare_monitoring, Monitoring};
use crate::network::{declare_network, Network};
use crate::roles::RoleCatalog;
use crate::schema::azure_schemas;

pub const EXPORT_RESOURCE_GROUP_NAME: &str = "rgName";
pub const EXPORT_NETWORK_NAME: &str = "networkName";
pub const EXPORT_CLUSTER_NAME: &str = "clusterName";
pub const EXPORT_KUBECONFIG: &str = "kubeconfig";
pub const EXPORT_SUBNETS: &str = "subnetDictionary";
pub const EXPORT_DNS_ZONE_ID: &str = "dnsZoneId";

/// Handles to every component of a declared landing zone.
#[derive(Debug, Clone)]
pub struct LandingZone {
    pub config: Arc<LandingZoneConfig>,
    pub network: Network,
    pub monitoring: Monitoring,
    /// Present when a subnet is tagged for the gateway.
    pub gateway: Option<Gateway>,
    pub cluster: Cluster,
    /// Present when a DNS zone is configured.
    pub dns: Option<DnsIntegration>,
}

impl LandingZone {
    /// Declare the whole landing zone into `stack` and register its exports.
    pub fn declare(
        stack: &mut Stack,
        config: Arc<LandingZoneConfig>,
        catalog: &dyn RoleCatalog,
    ) -> ZoneResult<Self> {
        let names = config.names()?;

        let network = declare_network(stack, &config, &names)?;
        let monitoring = declare_monitoring(
            stack,
            catalog,
            &config,
            &names,
            &network.resource_group_name(),
        )?;

        let gateway = stack
            .build_if_some(
                network.subnets.select(GATEWAY_SUBNET_TAG).ok(),
                |stack, subnet_id| declare_gateway(stack, &config, &names, &network, subnet_id),
            )?
            .map(|branch| branch.into_handle());

        let cluster = declare_cluster(
            stack,
            &config,
            &names,
            &network,
            &monitoring,
            gateway.as_ref(),
        )?;

        let dns = stack
            .build_if_some(config.dns_zone_name.clone(), |stack, zone_name| {
                declare_dns(
                    stack,
                    catalog,
                    &names,
                    &zone_name,
                    &network,
                    &cluster.kubeconfig,
                )
            })?
            .map(|branch| branch.into_handle());

        stack.export(EXPORT_RESOURCE_GROUP_NAME, &network.resource_group_name())?;
        stack.export(EXPORT_NETWORK_NAME, &network.network_name())?;
        stack.export(EXPORT_CLUSTER_NAME, &cluster.name())?;
        stack.export(EXPORT_KUBECONFIG, &cluster.kubeconfig)?;
        stack.export(EXPORT_SUBNETS, &network.subnets.ids())?;
        if let Some(dns) = &dns {
            stack.export(EXPORT_DNS_ZONE_ID, &dns.zone_id())?;
        }

        info!(
            "Declared landing zone for stack `{}`: {} resources (gateway: {}, dns: {})",
            config.stack,
            stack.len(),
            gateway.is_some(),
            dns.is_some()
        );
        Ok(Self {
            config,
            network,
            monitoring,
            gateway,
            cluster,
            dns,
        })
    }
}

/// Fresh stack named after the configuration, with the Azure schemas loaded.
pub fn landing_zone_stack(config: &LandingZoneConfig) -> Stack {
    Stack::new(config.stack.clone(), azure_schemas())
}
