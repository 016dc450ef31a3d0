//! CLI command definitions.
//!
//! Every command loads the same stack file, declares the landing zone into a
//! fresh stack, then inspects or deploys it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lz_azure::{landing_zone_stack, BuiltInRoleCatalog, LandingZone, LandingZoneConfig, ZoneError};
use lz_core::Stack;
use tracing::debug;

pub mod names;
pub mod plan;
pub mod up;

/// lz - Azure landing zone provisioning
#[derive(Parser)]
#[command(name = "lz")]
#[command(version, about = "Plan and deploy an Azure landing zone")]
#[command(long_about = r#"
Declares an Azure landing zone (network, monitoring, optional ingress gateway,
Kubernetes cluster, optional DNS) from a YAML stack file and resolves it against
a simulated backend.

COMMANDS:
  plan   → Print the resource graph in apply order
  up     → Resolve the graph and print the deployment report
  names  → Print the derived resource names

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Configuration error
  4 - Declaration error
  6 - Deployment partially failed
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Stack configuration file
    #[arg(short, long, global = true, default_value = "Pulumi.dev.yaml")]
    pub config: PathBuf,

    /// Stack name (defaults to the `Pulumi.<stack>.yaml` part of the file name)
    #[arg(short, long, global = true, env = "LZ_STACK")]
    pub stack: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the resource graph without deploying
    Plan(plan::PlanArgs),

    /// Deploy the landing zone against the simulated backend
    Up(up::UpArgs),

    /// Print the derived resource names
    Names(names::NamesArgs),
}

/// Returned by `up` when some resources failed or were skipped.
#[derive(Debug)]
pub struct PartialFailure {
    pub failed: usize,
    pub skipped: usize,
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deployment partially failed: {} failed, {} skipped",
            self.failed, self.skipped
        )
    }
}

impl std::error::Error for PartialFailure {}

/// Stack name from `Pulumi.<stack>.yaml`, or `dev`.
pub fn stack_name_from_path(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix("Pulumi."))
        .and_then(|rest| rest.strip_suffix(".yaml").or_else(|| rest.strip_suffix(".yml")))
        .filter(|stack| !stack.is_empty())
        .unwrap_or("dev")
        .to_string()
}

pub fn load_config(cli: &Cli) -> Result<Arc<LandingZoneConfig>> {
    let stack = cli
        .stack
        .clone()
        .unwrap_or_else(|| stack_name_from_path(&cli.config));
    debug!("Loading stack `{}` from {:?}", stack, cli.config);

    let config = LandingZoneConfig::from_file(stack, &cli.config)
        .map_err(ZoneError::from)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;
    Ok(Arc::new(config))
}

/// Declare the landing zone into a fresh stack.
pub fn declare(config: &Arc<LandingZoneConfig>) -> Result<(Stack, LandingZone)> {
    let catalog = BuiltInRoleCatalog::new(config.subscription_id.clone());
    let mut stack = landing_zone_stack(config);
    let zone = LandingZone::declare(&mut stack, Arc::clone(config), &catalog)
        .context("Failed to declare the landing zone")?;
    Ok((stack, zone))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;

    pub(crate) const STACK_FILE: &str = "
location: westeurope
mgmtGroupId: 7b0c1f0e-0000-4000-8000-000000000001
sshPubKey: ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC test@example
virtual-network-cidr: 10.0.0.0/16
subnets:
  - name: snet-agw
    cidr: 10.0.0.0/24
  - name: snet-aks
    cidr: 10.0.4.0/22
";

    pub(crate) fn cli_for(dir: &Path, args: &[&str]) -> Cli {
        let path = dir.join("Pulumi.development.yaml");
        fs::write(&path, STACK_FILE).unwrap();
        let mut argv = vec!["lz".to_string(), "--config".to_string(), path.display().to_string()];
        argv.extend(args.iter().map(|a| a.to_string()));
        Cli::parse_from(argv)
    }

    #[test]
    fn test_stack_name_from_path() {
        assert_eq!(stack_name_from_path(Path::new("Pulumi.prod.yaml")), "prod");
        assert_eq!(stack_name_from_path(Path::new("stacks/Pulumi.staging.yml")), "staging");
        assert_eq!(stack_name_from_path(Path::new("landing-zone.yaml")), "dev");
    }

    #[test]
    fn test_load_config_uses_file_stack_name() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli_for(dir.path(), &["names"]);

        let config = load_config(&cli).unwrap();
        assert_eq!(config.stack, "development");
        assert_eq!(config.env_short, "dev");
    }

    #[test]
    fn test_missing_config_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("Pulumi.dev.yaml");
        let cli = Cli::parse_from(["lz", "--config", missing.to_str().unwrap(), "plan"]);

        let err = load_config(&cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ZoneError>(),
            Some(ZoneError::Config(_))
        ));
    }
}
