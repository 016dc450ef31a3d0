//! Deterministic resource names.
//!
//! Names follow `{kind}-{app}-{location}-{environment}`, e.g.
//! `aks-payments-weu-dev`.

use serde::{Deserialize, Serialize};

use crate::error::DeclarationError;

/// Naming scheme prefix for each kind of resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    ResourceGroup,
    VirtualNetwork,
    KubernetesCluster,
    LogAnalyticsWorkspace,
    ManagedGrafana,
    ApplicationGateway,
    PublicIp,
    ManagedIdentity,
    Custom(String),
}

/// Prefixes owned by the built-in kinds.
pub const BUILT_IN_PREFIXES: [&str; 8] = ["rg", "vnet", "aks", "law", "grf", "agw", "pip", "id"];

impl ResourceKind {
    pub fn prefix(&self) -> &str {
        match self {
            Self::ResourceGroup => "rg",
            Self::VirtualNetwork => "vnet",
            Self::KubernetesCluster => "aks",
            Self::LogAnalyticsWorkspace => "law",
            Self::ManagedGrafana => "grf",
            Self::ApplicationGateway => "agw",
            Self::PublicIp => "pip",
            Self::ManagedIdentity => "id",
            Self::Custom(prefix) => prefix.as_str(),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// Derive the name of a resource.
///
/// Deterministic. Distinct (kind, app, location, environment) tuples give
/// distinct names, so a custom kind may not reuse a built-in prefix. Rejects
/// empty segments.
pub fn derive(
    kind: &ResourceKind,
    app: &str,
    location_short: &str,
    env_short: &str,
) -> Result<String, DeclarationError> {
    let segments = [
        ("kind", kind.prefix()),
        ("app", app),
        ("location", location_short),
        ("environment", env_short),
    ];
    if let Some((segment, _)) = segments.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(DeclarationError::EmptyNameSegment(segment));
    }
    if let ResourceKind::Custom(prefix) = kind {
        if BUILT_IN_PREFIXES.contains(&prefix.as_str()) {
            return Err(DeclarationError::ReservedPrefix(prefix.clone()));
        }
    }
    Ok(format!(
        "{}-{}-{}-{}",
        kind.prefix(),
        app,
        location_short,
        env_short
    ))
}

/// Validated (app, location, environment) triple shared by every name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameContext {
    app: String,
    location_short: String,
    env_short: String,
}

impl NameContext {
    pub fn new(
        app: impl Into<String>,
        location_short: impl Into<String>,
        env_short: impl Into<String>,
    ) -> Result<Self, DeclarationError> {
        let context = Self {
            app: app.into(),
            location_short: location_short.into(),
            env_short: env_short.into(),
        };
        // Validates the shared segments once; a custom kind can still be empty.
        derive(
            &ResourceKind::ResourceGroup,
            &context.app,
            &context.location_short,
            &context.env_short,
        )?;
        Ok(context)
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn location_short(&self) -> &str {
        &self.location_short
    }

    pub fn env_short(&self) -> &str {
        &self.env_short
    }

    pub fn derive(&self, kind: &ResourceKind) -> Result<String, DeclarationError> {
        derive(kind, &self.app, &self.location_short, &self.env_short)
    }
}
