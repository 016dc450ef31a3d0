//! Role definition lookup.

use std::collections::BTreeMap;

use lz_core::NotFound;

/// Resolves a role name to a role definition id.
#[cfg_attr(test, mockall::automock)]
pub trait RoleCatalog: Send + Sync {
    fn role_definition_id(&self, role_name: &str) -> Result<String, NotFound>;
}

/// Azure built-in roles used by the landing zone.
const BUILT_IN_ROLES: &[(&str, &str)] = &[
    ("Contributor", "b24988ac-6180-42a0-ab88-20f7382dd24c"),
    ("DNS Zone Contributor", "befefa01-2a29-4197-83a8-272ff33ce314"),
    ("Grafana Admin", "22926164-76b3-42b3-bc55-97df8dab3e41"),
    ("Managed Identity Operator", "f1a07417-d97a-45cb-824c-7a7467783830"),
    ("Monitoring Reader", "43d0d8ad-25c7-4714-9337-8ba259a9fe05"),
    ("Network Contributor", "4d97b98b-1d4f-4787-a291-c67834d212e7"),
    ("Reader", "acdd72a7-3385-48ef-bd42-f606fba81ae7"),
];

/// Catalog of built-in role definitions scoped to one subscription.
#[derive(Debug, Clone)]
pub struct BuiltInRoleCatalog {
    subscription_id: String,
    roles: BTreeMap<String, String>,
}

impl BuiltInRoleCatalog {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            roles: BUILT_IN_ROLES
                .iter()
                .map(|(name, guid)| (name.to_string(), guid.to_string()))
                .collect(),
        }
    }

    /// Add or replace a custom role definition.
    pub fn with_role(mut self, name: impl Into<String>, guid: impl Into<String>) -> Self {
        self.roles.insert(name.into(), guid.into());
        self
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(|k| k.as_str())
    }
}

impl RoleCatalog for BuiltInRoleCatalog {
    fn role_definition_id(&self, role_name: &str) -> Result<String, NotFound> {
        self.roles
            .get(role_name)
            .filter(|guid| !guid.is_empty())
            .map(|guid| {
                format!(
                    "/subscriptions/{}/providers/Microsoft.Authorization/roleDefinitions/{}",
                    self.subscription_id, guid
                )
            })
            .ok_or_else(|| NotFound::new("role", role_name))
    }
}
