//! Ingress application gateway.
//!
//! Declared only when the network has a subnet tagged `agw`. Sub-resource
//! references inside the gateway are plain ids built from the resource group
//! id, since they point into the gateway being created.

use lz_core::{
    DeclarationError, Deferred, NameContext, Properties, Resource, ResourceKind, ResourceOptions,
    Stack,
};
use tracing::info;

use crate::config::LandingZoneConfig;
use crate::network::Network;
use crate::schema::{APPLICATION_GATEWAY, PUBLIC_IP_ADDRESS};

/// Subnet tag the gateway is placed into.
pub const GATEWAY_SUBNET_TAG: &str = "agw";

/// Names of the gateway's internal sub-resources, derived from the cluster name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayNames {
    pub backend_address_pool: String,
    pub frontend_port_http: String,
    pub frontend_port_https: String,
    pub frontend_public_ip: String,
    pub http_setting: String,
    pub listener: String,
    pub routing_rule: String,
}

impl GatewayNames {
    pub fn for_cluster(cluster_name: &str) -> Self {
        let name = |suffix: &str| format!("{}-01-agic-{}", cluster_name, suffix);
        Self {
            backend_address_pool: name("beap-0"),
            frontend_port_http: name("fe-http-0"),
            frontend_port_https: name("fe-https-0"),
            frontend_public_ip: name("feip-0"),
            http_setting: name("be-htst-0"),
            listener: name("httplstn-0"),
            routing_rule: name("rqrt-0"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Gateway {
    pub public_ip: Resource,
    pub gateway: Resource,
}

impl Gateway {
    pub fn id(&self) -> Deferred<String> {
        self.gateway.id()
    }

    pub fn public_ip_id(&self) -> Deferred<String> {
        self.public_ip.id()
    }
}

fn sub_resource(
    group_id: &Deferred<String>,
    gateway_name: &str,
    collection: &'static str,
    name: &str,
) -> Properties {
    let gateway_name = gateway_name.to_string();
    let name = name.to_string();
    Properties::new().set(
        "id",
        group_id.map(move |id| {
            format!(
                "{}/providers/Microsoft.Network/applicationGateways/{}/{}/{}",
                id, gateway_name, collection, name
            )
        }),
    )
}

pub fn declare_gateway(
    stack: &mut Stack,
    config: &LandingZoneConfig,
    names: &NameContext,
    network: &Network,
    subnet_id: Deferred<String>,
) -> Result<Gateway, DeclarationError> {
    let gateway_name = names.derive(&ResourceKind::ApplicationGateway)?;
    let sub = GatewayNames::for_cluster(&names.derive(&ResourceKind::KubernetesCluster)?);
    let group_name = network.resource_group_name();
    let group_id = network.resource_group_id();

    let public_ip = stack.declare(
        PUBLIC_IP_ADDRESS,
        names.derive(&ResourceKind::PublicIp)?,
        Properties::new()
            .set("resourceGroupName", &group_name)
            .set("location", config.location.as_str())
            .set("sku", Properties::new().set("name", "Standard"))
            .set("publicIPAllocationMethod", "Static"),
        ResourceOptions::new(),
    )?;

    let properties = Properties::new()
        .set("applicationGatewayName", gateway_name.as_str())
        .set("resourceGroupName", &group_name)
        .set("location", config.location.as_str())
        .set(
            "sku",
            Properties::new()
                .set("name", "WAF_v2")
                .set("tier", "WAF_v2")
                .set("capacity", 3u32),
        )
        .set(
            "gatewayIPConfigurations",
            vec![Properties::new()
                .set("name", "appGatewayIpConfig")
                .set("subnet", Properties::new().set("id", subnet_id))],
        )
        .set(
            "frontendPorts",
            vec![
                Properties::new()
                    .set("name", sub.frontend_port_https.as_str())
                    .set("port", 443u32),
                Properties::new()
                    .set("name", sub.frontend_port_http.as_str())
                    .set("port", 80u32),
            ],
        )
        .set(
            "frontendIPConfigurations",
            vec![Properties::new()
                .set("name", sub.frontend_public_ip.as_str())
                .set("publicIPAddress", Properties::new().set("id", public_ip.id()))],
        )
        .set(
            "backendAddressPools",
            vec![Properties::new().set("name", sub.backend_address_pool.as_str())],
        )
        .set(
            "backendHttpSettingsCollection",
            vec![Properties::new()
                .set("name", sub.http_setting.as_str())
                .set("cookieBasedAffinity", "Disabled")
                .set("port", 80u32)
                .set("protocol", "Http")
                .set("requestTimeout", 30u32)],
        )
        .set(
            "httpListeners",
            vec![Properties::new()
                .set("name", sub.listener.as_str())
                .set("protocol", "Http")
                .set(
                    "frontendIPConfiguration",
                    sub_resource(&group_id, &gateway_name, "frontendIPConfigurations", &sub.frontend_public_ip),
                )
                .set(
                    "frontendPort",
                    sub_resource(&group_id, &gateway_name, "frontendPorts", &sub.frontend_port_http),
                )],
        )
        .set(
            "requestRoutingRules",
            vec![Properties::new()
                .set("name", sub.routing_rule.as_str())
                .set("ruleType", "Basic")
                .set("priority", 100u32)
                .set(
                    "backendAddressPool",
                    sub_resource(&group_id, &gateway_name, "backendAddressPools", &sub.backend_address_pool),
                )
                .set(
                    "backendHttpSettings",
                    sub_resource(&group_id, &gateway_name, "backendHttpSettingsCollection", &sub.http_setting),
                )
                .set(
                    "httpListener",
                    sub_resource(&group_id, &gateway_name, "httpListeners", &sub.listener),
                )],
        )
        .set(
            "webApplicationFirewallConfiguration",
            Properties::new()
                .set("enabled", true)
                .set("firewallMode", "Prevention")
                .set("ruleSetType", "OWASP")
                .set("ruleSetVersion", "3.0"),
        );

    let gateway = stack.declare(
        APPLICATION_GATEWAY,
        gateway_name,
        properties,
        ResourceOptions::new(),
    )?;

    info!("Declared application gateway {}", gateway.name());
    Ok(Gateway { public_ip, gateway })
}
