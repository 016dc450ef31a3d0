//! Cluster credential materialization.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lz_core::{Deferred, Properties, ResolutionFailure, Stack};
use serde_json::Value;

use crate::schema::LIST_CLUSTER_USER_CREDENTIALS;

/// Decode a base64 kubeconfig into UTF-8 text.
pub fn decode_kubeconfig(encoded: &str) -> Result<String, ResolutionFailure> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ResolutionFailure::Transform(format!("kubeconfig is not valid base64: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| ResolutionFailure::Transform(format!("kubeconfig is not valid UTF-8: {}", e)))
}

/// First kubeconfig value of a `listManagedClusterUserCredentials` result.
pub fn first_kubeconfig(result: &Value) -> Result<&str, ResolutionFailure> {
    result
        .get("kubeconfigs")
        .and_then(|k| k.get(0))
        .and_then(|k| k.get("value"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ResolutionFailure::Transform("credential result has no kubeconfigs".to_string())
        })
}

/// Invoke the credential function and decode its first kubeconfig.
///
/// The result is secret.
pub fn cluster_kubeconfig(
    stack: &mut Stack,
    resource_group_name: &Deferred<String>,
    cluster_name: &Deferred<String>,
) -> Deferred<String> {
    stack
        .invoke(
            LIST_CLUSTER_USER_CREDENTIALS,
            Properties::new()
                .set("resourceGroupName", resource_group_name)
                .set("resourceName", cluster_name),
        )
        .try_map(|result| first_kubeconfig(&result).and_then(decode_kubeconfig))
        .secret()
}

/// Encode a kubeconfig the way the credential function returns it.
pub fn encode_kubeconfig(kubeconfig: &str) -> String {
    STANDARD.encode(kubeconfig.as_bytes())
}
