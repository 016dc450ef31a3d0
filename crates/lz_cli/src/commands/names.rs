//! Names command - Print the derived resource names.

use anyhow::Result;
use clap::Args;
use lz_azure::dns::EXTERNAL_DNS_APP;
use lz_azure::{GatewayNames, ZoneError};
use lz_core::naming::derive;
use lz_core::{NameContext, ResourceKind};

use super::{load_config, Cli};

#[derive(Args)]
pub struct NamesArgs {
    /// Also print the gateway's internal sub-resource names
    #[arg(long)]
    gateway: bool,
}

const KINDS: [ResourceKind; 7] = [
    ResourceKind::ResourceGroup,
    ResourceKind::VirtualNetwork,
    ResourceKind::KubernetesCluster,
    ResourceKind::LogAnalyticsWorkspace,
    ResourceKind::ManagedGrafana,
    ResourceKind::ApplicationGateway,
    ResourceKind::PublicIp,
];

/// `(kind, name)` for every resource named through the deriver.
pub fn derived_names(names: &NameContext) -> Result<Vec<(String, String)>> {
    let mut derived = Vec::with_capacity(KINDS.len() + 1);
    for kind in &KINDS {
        derived.push((kind.to_string(), names.derive(kind)?));
    }
    derived.push((
        ResourceKind::ManagedIdentity.to_string(),
        derive(
            &ResourceKind::ManagedIdentity,
            EXTERNAL_DNS_APP,
            names.location_short(),
            names.env_short(),
        )?,
    ));
    Ok(derived)
}

pub async fn execute(cli: &Cli, args: &NamesArgs) -> Result<()> {
    let config = load_config(cli)?;
    let names = config.names().map_err(ZoneError::from)?;

    println!(
        "🏷️  Names for `{}` in {} ({})",
        config.stack, config.location, config.location_short
    );
    for (kind, name) in derived_names(&names)? {
        println!("   {:<24} {}", kind, name);
    }

    if args.gateway {
        let sub = GatewayNames::for_cluster(&names.derive(&ResourceKind::KubernetesCluster)?);
        println!();
        println!("   Gateway sub-resources:");
        for name in [
            &sub.backend_address_pool,
            &sub.frontend_port_http,
            &sub.frontend_port_https,
            &sub.frontend_public_ip,
            &sub.http_setting,
            &sub.listener,
            &sub.routing_rule,
        ] {
            println!("   {}", name);
        }
    }

    Ok(())
}
