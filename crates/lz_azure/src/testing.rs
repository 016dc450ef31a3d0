//! Shared fixtures for unit tests.

use crate::config::LandingZoneConfig;

pub(crate) const SAMPLE_STACK: &str = "
location: westeurope
subscriptionId: 11111111-2222-3333-4444-555555555555
mgmtGroupId: 7b0c1f0e-0000-4000-8000-000000000001
sshPubKey: ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC test@example
virtual-network-cidr: 10.0.0.0/16
subnets:
  - name: snet-agw
    cidr: 10.0.0.0/24
  - name: snet-aks
    cidr: 10.0.4.0/22
";

/// Configuration for the `development` stack in West Europe.
pub(crate) fn sample_config(dns_zone: Option<&str>) -> LandingZoneConfig {
    let mut config = LandingZoneConfig::from_yaml_str("development", SAMPLE_STACK)
        .expect("sample stack file is valid");
    config.dns_zone_name = dns_zone.map(str::to_string);
    config
}
