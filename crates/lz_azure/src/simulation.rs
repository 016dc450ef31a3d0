//! A simulated backend that understands the landing zone's resource types.

use lz_core::{Outputs, SimulatedBackend};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::LandingZoneConfig;
use crate::credentials::encode_kubeconfig;
use crate::schema::{LIST_CLUSTER_USER_CREDENTIALS, MANAGED_GRAFANA};

/// Kubeconfig the simulated credential function hands out for `cluster`.
pub fn simulated_kubeconfig(cluster: &str) -> String {
    format!(
        "apiVersion: v1\nkind: Config\nclusters:\n- name: {cluster}\n  cluster:\n    server: https://{cluster}.hcp.simulated.azmk8s.io:443\ncontexts:\n- name: {cluster}\n  context:\n    cluster: {cluster}\n    user: clusterUser_{cluster}\ncurrent-context: {cluster}\nusers:\n- name: clusterUser_{cluster}\n",
        cluster = cluster
    )
}

/// Simulated backend for the subscription in `config`.
pub fn simulated_backend(config: &LandingZoneConfig) -> SimulatedBackend {
    let mut grafana = Outputs::new();
    grafana.insert(
        "identity".to_string(),
        json!({
            "type": "SystemAssigned",
            "principalId": Uuid::new_v4().to_string(),
        }),
    );

    SimulatedBackend::new(config.subscription_id.clone())
        .with_type_outputs(MANAGED_GRAFANA, grafana)
        .with_invoke(LIST_CLUSTER_USER_CREDENTIALS, |args: &Value| {
            let cluster = args
                .get("resourceName")
                .and_then(Value::as_str)
                .ok_or_else(|| "resourceName is required".to_string())?;
            Ok(json!({
                "kubeconfigs": [{
                    "name": "clusterUser",
                    "value": encode_kubeconfig(&simulated_kubeconfig(cluster)),
                }]
            }))
        })
}
