//! Plan command - Print the resource graph in apply order.

use anyhow::Result;
use clap::Args;
use lz_core::Stack;
use tracing::info;

use super::{declare, load_config, Cli};

#[derive(Args)]
pub struct PlanArgs {
    /// Group resources into waves that can apply concurrently
    #[arg(long)]
    waves: bool,
}

/// One line per descriptor: name, type and what it waits for.
pub fn render_plan(stack: &Stack) -> Vec<String> {
    stack
        .topological_order()
        .into_iter()
        .filter_map(|name| stack.get(name))
        .map(|descriptor| {
            let dependencies: Vec<&str> =
                descriptor.dependencies().iter().map(|d| d.as_str()).collect();
            if dependencies.is_empty() {
                format!("{} ({})", descriptor.name(), descriptor.resource_type())
            } else {
                format!(
                    "{} ({}) <- {}",
                    descriptor.name(),
                    descriptor.resource_type(),
                    dependencies.join(", ")
                )
            }
        })
        .collect()
}

pub async fn execute(cli: &Cli, args: &PlanArgs) -> Result<()> {
    let config = load_config(cli)?;
    let (stack, zone) = declare(&config)?;
    info!("Planning stack `{}`", stack.name());

    println!("📋 Plan for stack `{}` ({} resources)", stack.name(), stack.len());
    if args.waves {
        for (i, wave) in stack.apply_waves().iter().enumerate() {
            println!("   Wave {}: {}", i + 1, wave.join(", "));
        }
    } else {
        for line in render_plan(&stack) {
            println!("   {}", line);
        }
    }

    println!();
    println!(
        "   Gateway: {}",
        if zone.gateway.is_some() { "enabled" } else { "disabled (no agw subnet)" }
    );
    println!(
        "   DNS:     {}",
        config.dns_zone_name.as_deref().unwrap_or("disabled")
    );
    println!(
        "   Exports: {}",
        stack.export_names().collect::<Vec<_>>().join(", ")
    );
    if stack.invoke_count() > 0 {
        println!("   Invokes: {}", stack.invoke_count());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::cli_for;

    #[test]
    fn test_plan_orders_dependencies_first() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli_for(dir.path(), &["plan"]);
        let config = load_config(&cli).unwrap();
        let (stack, _) = declare(&config).unwrap();

        let lines = render_plan(&stack);
        let position = |name: &str| {
            lines
                .iter()
                .position(|l| l.starts_with(&format!("{} (", name)))
                .unwrap()
        };

        assert_eq!(lines.len(), stack.len());
        assert!(lines[position("rg-aks-weu-dev")].ends_with("ResourceGroup)"));
        assert!(position("vnet-aks-weu-dev") < position("snet-aks"));
        assert!(position("snet-agw") < position("agw-aks-weu-dev"));
        assert!(position("agw-aks-weu-dev") < position("aks-aks-weu-dev"));
    }
}
