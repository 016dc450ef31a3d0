//! Outcome of a deployment pass.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Terminal state of one descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResourceOutcome {
    Succeeded,
    /// The backend rejected the apply.
    Failed { message: String },
    /// Never applied because something it consumes failed.
    Skipped {
        upstream: Option<String>,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReport {
    pub name: String,
    pub resource_type: String,
    pub outcome: ResourceOutcome,
}

/// Terminal state of one export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportValue {
    Resolved { value: Value },
    /// Resolved, but marked secret and withheld from the report.
    Secret,
    Failed { reason: String },
}

/// Counts by outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// What happened to every descriptor and export of one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub deployment_id: Uuid,
    pub stack: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// In declaration order.
    pub resources: Vec<ResourceReport>,
    pub exports: BTreeMap<String, ExportValue>,
}

impl DeploymentReport {
    fn names_with<F>(&self, predicate: F) -> Vec<&str>
    where
        F: Fn(&ResourceOutcome) -> bool,
    {
        self.resources
            .iter()
            .filter(|r| predicate(&r.outcome))
            .map(|r| r.name.as_str())
            .collect()
    }

    pub fn succeeded(&self) -> Vec<&str> {
        self.names_with(|o| matches!(o, ResourceOutcome::Succeeded))
    }

    pub fn failed(&self) -> Vec<&str> {
        self.names_with(|o| matches!(o, ResourceOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.names_with(|o| matches!(o, ResourceOutcome::Skipped { .. }))
    }

    /// True when every descriptor applied and every export resolved.
    pub fn is_success(&self) -> bool {
        self.resources
            .iter()
            .all(|r| r.outcome == ResourceOutcome::Succeeded)
            && !self
                .exports
                .values()
                .any(|e| matches!(e, ExportValue::Failed { .. }))
    }

    pub fn outcome_of(&self, name: &str) -> Option<&ResourceOutcome> {
        self.resources
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }

    pub fn export(&self, name: &str) -> Option<&ExportValue> {
        self.exports.get(name)
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for resource in &self.resources {
            match resource.outcome {
                ResourceOutcome::Succeeded => summary.succeeded += 1,
                ResourceOutcome::Failed { .. } => summary.failed += 1,
                ResourceOutcome::Skipped { .. } => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }

    /// Where `save` writes this report under `dir`.
    pub fn report_path(&self, dir: &Path) -> PathBuf {
        dir.join(".lz")
            .join("deployments")
            .join(format!("{}.json", self.deployment_id))
    }

    /// Save the report as pretty JSON; returns the written path.
    pub fn save(&self, dir: &Path) -> CoreResult<PathBuf> {
        let path = self.report_path(dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        fs::write(&path, json)?;
        debug!("Saved deployment report to {:?}", path);
        Ok(path)
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ReportNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn report() -> DeploymentReport {
        let now = Utc::now();
        let mut exports = BTreeMap::new();
        exports.insert(
            "rgName".to_string(),
            ExportValue::Resolved {
                value: json!("rg-aks-weu-dev"),
            },
        );
        exports.insert("kubeconfig".to_string(), ExportValue::Secret);

        DeploymentReport {
            deployment_id: Uuid::new_v4(),
            stack: "dev".to_string(),
            started_at: now,
            completed_at: now,
            resources: vec![
                ResourceReport {
                    name: "rg".to_string(),
                    resource_type: "test:res:Group".to_string(),
                    outcome: ResourceOutcome::Succeeded,
                },
                ResourceReport {
                    name: "vnet".to_string(),
                    resource_type: "test:net:Network".to_string(),
                    outcome: ResourceOutcome::Failed {
                        message: "quota".to_string(),
                    },
                },
                ResourceReport {
                    name: "snet".to_string(),
                    resource_type: "test:net:Subnet".to_string(),
                    outcome: ResourceOutcome::Skipped {
                        upstream: Some("vnet".to_string()),
                        reason: "resource `vnet` failed to apply: quota".to_string(),
                    },
                },
            ],
            exports,
        }
    }

    #[test]
    fn test_partitions_and_summary() {
        let report = report();
        assert_eq!(report.succeeded(), vec!["rg"]);
        assert_eq!(report.failed(), vec!["vnet"]);
        assert_eq!(report.skipped(), vec!["snet"]);
        assert!(!report.is_success());
        assert_eq!(
            report.summary(),
            ReportSummary {
                succeeded: 1,
                failed: 1,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let report = report();

        let path = report.save(temp.path()).unwrap();
        assert!(path.ends_with(format!("{}.json", report.deployment_id)));

        let loaded = DeploymentReport::load(&path).unwrap();
        assert_eq!(loaded.deployment_id, report.deployment_id);
        assert_eq!(loaded.resources, report.resources);
        assert_eq!(loaded.export("kubeconfig"), Some(&ExportValue::Secret));
    }

    #[test]
    fn test_load_missing_report() {
        let temp = TempDir::new().unwrap();
        let result = DeploymentReport::load(&temp.path().join("missing.json"));
        assert!(matches!(result, Err(CoreError::ReportNotFound(_))));
    }
}
