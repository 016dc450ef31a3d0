//! Stack configuration.
//!
//! Read once at startup from a YAML stack file, validated, then shared
//! read-only (behind an `Arc`) by every component. Both a flat layout and the
//! namespaced `config:` layout of a Pulumi stack file are accepted:
//!
//! ```yaml
//! config:
//!   azure-native:location: westeurope
//!   aks:mgmtGroupId: 7b0c1f0e-...
//!   aks:sshPubKey: ssh-rsa AAAA...
//!   aks:virtual-network-cidr: 10.0.0.0/16
//!   aks:subnets:
//!     - name: snet-aks
//!       cidr: 10.0.0.0/22
//! ```

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use lz_core::{DeclarationError, NameContext, SubnetSpec};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const DEFAULT_NUM_WORKER_NODES: u32 = 3;
pub const DEFAULT_KUBERNETES_VERSION: &str = "1.24.3";
pub const DEFAULT_PREFIX_FOR_DNS: &str = "pulumi";
pub const DEFAULT_NODE_VM_SIZE: &str = "Standard_DS2_v2";
pub const DEFAULT_APPLICATION: &str = "aks";
pub const DEFAULT_SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Stack file contents before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    pub location: Option<String>,
    pub subscription_id: Option<String>,
    pub mgmt_group_id: Option<String>,
    pub ssh_pub_key: Option<String>,
    #[serde(rename = "virtual-network-cidr")]
    pub virtual_network_cidr: Option<String>,
    pub subnets: Option<Vec<SubnetSpec>>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub num_worker_nodes: Option<u32>,
    pub kubernetes_version: Option<String>,
    pub prefix_for_dns: Option<String>,
    pub node_vm_size: Option<String>,
    pub application: Option<String>,
    pub dns_zone_name: Option<String>,
}

/// `pulumi config set` stores every scalar as a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u32),
    Text(String),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("`{}` is not a count: {}", text, e))),
    }
}

impl RawConfig {
    /// Parse either layout of stack file.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let document: serde_yaml::Value = serde_yaml::from_str(content)?;
        let document = match document.get("config") {
            Some(serde_yaml::Value::Mapping(namespaced)) => {
                let mut flat = serde_yaml::Mapping::new();
                for (key, value) in namespaced {
                    let key = match key.as_str() {
                        Some(k) => k.rsplit(':').next().unwrap_or(k).to_string(),
                        None => continue,
                    };
                    flat.insert(serde_yaml::Value::from(key), value.clone());
                }
                serde_yaml::Value::Mapping(flat)
            }
            _ => document,
        };
        Ok(serde_yaml::from_value(document)?)
    }
}

/// Validated, immutable configuration context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LandingZoneConfig {
    pub stack: String,
    pub location: String,
    pub location_short: String,
    pub env_short: String,
    pub subscription_id: String,
    pub admin_group_id: String,
    pub ssh_public_key: String,
    pub vnet_cidr: String,
    pub subnets: Vec<SubnetSpec>,
    pub num_worker_nodes: u32,
    pub kubernetes_version: String,
    pub dns_prefix: String,
    pub node_vm_size: String,
    pub application: String,
    pub dns_zone_name: Option<String>,
}

/// Blank values fall back to `default`.
fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn cidr_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})/(\d{1,2})$").ok())
        .as_ref()
}

fn validate_cidr(key: &'static str, cidr: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::Invalid {
        key,
        message: format!("`{}` is not an IPv4 CIDR block", cidr),
    };
    let Some(caps) = cidr_pattern().and_then(|re| re.captures(cidr)) else {
        return Err(invalid());
    };
    let octets_ok = (1..=4).all(|i| caps[i].parse::<u16>().map_or(false, |o| o <= 255));
    let prefix_ok = caps[5].parse::<u8>().map_or(false, |p| p <= 32);
    if octets_ok && prefix_ok {
        Ok(())
    } else {
        Err(invalid())
    }
}

impl LandingZoneConfig {
    pub fn from_raw(stack: impl Into<String>, raw: RawConfig) -> Result<Self, ConfigError> {
        let stack = stack.into();
        if stack.trim().is_empty() {
            return Err(ConfigError::Missing("stack"));
        }

        let location = required(raw.location, "location")?;
        let admin_group_id = required(raw.mgmt_group_id, "mgmtGroupId")?;
        let ssh_public_key = required(raw.ssh_pub_key, "sshPubKey")?;
        let vnet_cidr = required(raw.virtual_network_cidr, "virtual-network-cidr")?;
        let subnets = raw.subnets.ok_or(ConfigError::Missing("subnets"))?;

        validate_cidr("virtual-network-cidr", &vnet_cidr)?;
        for subnet in &subnets {
            if subnet.name.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key: "subnets",
                    message: "subnet name must not be empty".to_string(),
                });
            }
            validate_cidr("subnets", &subnet.cidr)?;
        }

        let num_worker_nodes = raw.num_worker_nodes.unwrap_or(DEFAULT_NUM_WORKER_NODES);
        if num_worker_nodes == 0 {
            return Err(ConfigError::Invalid {
                key: "numWorkerNodes",
                message: "at least one worker node is required".to_string(),
            });
        }

        let config = Self {
            location_short: location_short(&location),
            env_short: environment_short(&stack),
            stack,
            location,
            subscription_id: or_default(raw.subscription_id, DEFAULT_SUBSCRIPTION_ID),
            admin_group_id,
            ssh_public_key,
            vnet_cidr,
            subnets,
            num_worker_nodes,
            kubernetes_version: or_default(raw.kubernetes_version, DEFAULT_KUBERNETES_VERSION),
            dns_prefix: or_default(raw.prefix_for_dns, DEFAULT_PREFIX_FOR_DNS),
            node_vm_size: or_default(raw.node_vm_size, DEFAULT_NODE_VM_SIZE),
            application: or_default(raw.application, DEFAULT_APPLICATION),
            dns_zone_name: raw.dns_zone_name.filter(|z| !z.trim().is_empty()),
        };
        debug!(
            "Loaded configuration for stack `{}` in {} ({} subnets)",
            config.stack,
            config.location,
            config.subnets.len()
        );
        Ok(config)
    }

    pub fn from_yaml_str(stack: impl Into<String>, content: &str) -> Result<Self, ConfigError> {
        Self::from_raw(stack, RawConfig::from_yaml_str(content)?)
    }

    pub fn from_file(stack: impl Into<String>, path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(stack, &content)
    }

    /// Naming context for every derived resource name.
    pub fn names(&self) -> Result<NameContext, DeclarationError> {
        NameContext::new(&self.application, &self.location_short, &self.env_short)
    }

    pub fn has_dns(&self) -> bool {
        self.dns_zone_name.is_some()
    }
}

/// Short code for an Azure region; unknown regions pass through unchanged.
pub fn location_short(location: &str) -> String {
    let normalized: String = location
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let short = match normalized.as_str() {
        "westeurope" => "weu",
        "northeurope" => "neu",
        "eastus" => "eus",
        "eastus2" => "eus2",
        "westus" => "wus",
        "westus2" => "wus2",
        "westus3" => "wus3",
        "centralus" => "cus",
        "uksouth" => "uks",
        "ukwest" => "ukw",
        "francecentral" => "frc",
        "germanywestcentral" => "gwc",
        "swedencentral" => "sdc",
        "switzerlandnorth" => "chn",
        "norwayeast" => "noe",
        "australiaeast" => "aue",
        "southeastasia" => "sea",
        "japaneast" => "jpe",
        _ => return normalized,
    };
    short.to_string()
}

/// Short code for an environment or stack name; unknown names pass through.
pub fn environment_short(environment: &str) -> String {
    let normalized = environment.trim().to_lowercase();
    let short = match normalized.as_str() {
        "development" | "dev" => "dev",
        "test" | "testing" | "tst" => "tst",
        "acceptance" | "acc" | "uat" => "acc",
        "staging" | "stage" | "stg" => "stg",
        "production" | "prod" | "prd" => "prd",
        "sandbox" | "sbx" => "sbx",
        _ => return normalized,
    };
    short.to_string()
}
