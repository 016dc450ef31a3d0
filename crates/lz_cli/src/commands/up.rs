//! Up command - Resolve the landing zone against the simulated backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use lz_azure::simulated_backend;
use lz_core::{Deployer, DeploymentReport, ExportValue, ResourceOutcome};
use tracing::{info, warn};

use super::{declare, load_config, Cli, PartialFailure};

#[derive(Args)]
pub struct UpArgs {
    /// Make the simulated backend reject this resource (repeatable)
    #[arg(long = "fail", value_name = "NAME")]
    fail: Vec<String>,

    /// Save the deployment report under this directory
    #[arg(long, value_name = "DIR")]
    save_report: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: String,
}

/// Human-readable report lines.
pub fn render_report(report: &DeploymentReport) -> Vec<String> {
    let mut lines = Vec::new();
    for resource in &report.resources {
        let line = match &resource.outcome {
            ResourceOutcome::Succeeded => format!("✅ {}", resource.name),
            ResourceOutcome::Failed { message } => format!("❌ {}: {}", resource.name, message),
            ResourceOutcome::Skipped {
                upstream: Some(upstream),
                ..
            } => format!("⏭️  {} (upstream `{}` failed)", resource.name, upstream),
            ResourceOutcome::Skipped { reason, .. } => {
                format!("⏭️  {} ({})", resource.name, reason)
            }
        };
        lines.push(line);
    }
    for (name, export) in &report.exports {
        let line = match export {
            ExportValue::Resolved { value } => format!("📤 {} = {}", name, value),
            ExportValue::Secret => format!("📤 {} = [secret]", name),
            ExportValue::Failed { reason } => format!("📤 {} unresolved: {}", name, reason),
        };
        lines.push(line);
    }
    lines
}

pub async fn execute(cli: &Cli, args: &UpArgs) -> Result<()> {
    let config = load_config(cli)?;
    let (stack, _zone) = declare(&config)?;

    let mut backend = simulated_backend(&config);
    for name in &args.fail {
        if !stack.contains(name) {
            warn!("--fail names an undeclared resource: {}", name);
        }
        backend = backend.fail_resource(name.clone(), "rejected on request");
    }

    info!("Deploying stack `{}` ({} resources)", stack.name(), stack.len());
    let report = Deployer::new(Arc::new(backend)).resolve_all(stack).await;

    if args.format == "json" {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        for line in render_report(&report) {
            println!("   {}", line);
        }
        let summary = report.summary();
        println!();
        println!(
            "   {} succeeded, {} failed, {} skipped in {} ms",
            summary.succeeded,
            summary.failed,
            summary.skipped,
            report.duration_ms()
        );
    }

    if let Some(dir) = &args.save_report {
        let path = report
            .save(dir)
            .with_context(|| format!("Failed to save report under {:?}", dir))?;
        println!("📝 Report saved to {}", path.display());
    }

    let summary = report.summary();
    if report.is_success() {
        Ok(())
    } else {
        Err(PartialFailure {
            failed: summary.failed,
            skipped: summary.skipped,
        }
        .into())
    }
}
