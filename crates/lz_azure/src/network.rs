//! Resource group, virtual network and subnets.

use lz_core::{
    DeclarationError, Deferred, NameContext, Properties, Resource, ResourceKind, ResourceOptions,
    Stack, SubnetTable,
};
use tracing::info;

use crate::config::LandingZoneConfig;
use crate::schema::{RESOURCE_GROUP, SUBNET, VIRTUAL_NETWORK};

/// The network foundation every other component is placed into.
#[derive(Debug, Clone)]
pub struct Network {
    pub resource_group: Resource,
    pub virtual_network: Resource,
    pub subnets: SubnetTable,
}

impl Network {
    pub fn resource_group_name(&self) -> Deferred<String> {
        self.resource_group.remote_name()
    }

    pub fn resource_group_id(&self) -> Deferred<String> {
        self.resource_group.id()
    }

    pub fn network_name(&self) -> Deferred<String> {
        self.virtual_network.remote_name()
    }

    pub fn network_id(&self) -> Deferred<String> {
        self.virtual_network.id()
    }
}

pub fn declare_network(
    stack: &mut Stack,
    config: &LandingZoneConfig,
    names: &NameContext,
) -> Result<Network, DeclarationError> {
    let resource_group = stack.declare(
        RESOURCE_GROUP,
        names.derive(&ResourceKind::ResourceGroup)?,
        Properties::new().set("location", config.location.as_str()),
        ResourceOptions::new(),
    )?;

    let virtual_network = stack.declare(
        VIRTUAL_NETWORK,
        names.derive(&ResourceKind::VirtualNetwork)?,
        Properties::new()
            .set("resourceGroupName", resource_group.remote_name())
            .set("location", config.location.as_str())
            .set(
                "addressSpace",
                Properties::new().set("addressPrefixes", vec![config.vnet_cidr.as_str()]),
            ),
        ResourceOptions::new(),
    )?;

    let mut subnets = SubnetTable::new();
    for spec in &config.subnets {
        let subnet = stack.declare(
            SUBNET,
            spec.name.clone(),
            Properties::new()
                .set("addressPrefix", spec.cidr.as_str())
                .set("resourceGroupName", resource_group.remote_name())
                .set("virtualNetworkName", virtual_network.remote_name()),
            ResourceOptions::new(),
        )?;
        subnets.insert(spec.clone(), subnet.id());
    }

    info!(
        "Declared network {} with {} subnets",
        virtual_network.name(),
        subnets.len()
    );
    Ok(Network {
        resource_group,
        virtual_network,
        subnets,
    })
}
