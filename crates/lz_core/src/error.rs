//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while driving a deployment pass.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Declaration error: {0}")]
    Declaration(#[from] DeclarationError),

    #[error("Deployment report not found: {0}")]
    ReportNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A malformed or colliding declaration, raised synchronously at declare time.
///
/// Any of these aborts the deployment pass: an invalid graph shape cannot be
/// partially applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("resource `{name}` is already declared as `{existing_type}` (attempted `{requested_type}`)")]
    DuplicateName {
        name: String,
        existing_type: String,
        requested_type: String,
    },

    #[error("no schema registered for resource type `{0}`")]
    UnknownType(String),

    #[error("resource `{name}` of type `{resource_type}` is missing required property `{property}`")]
    MissingProperty {
        name: String,
        resource_type: String,
        property: String,
    },

    #[error("resource `{name}` depends on undeclared resource `{dependency}`")]
    UnknownDependency { name: String, dependency: String },

    #[error("name segment `{0}` must not be empty")]
    EmptyNameSegment(&'static str),

    #[error("custom resource kind `{0}` reuses a built-in prefix")]
    ReservedPrefix(String),

    #[error("export `{0}` is already declared")]
    DuplicateExport(String),
}

/// Terminal failure of a deferred value.
///
/// Cloned into every consumer derived through `map`/`combine`, so it carries
/// owned strings only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    #[error("resource `{resource}` failed to apply: {message}")]
    Apply { resource: String, message: String },

    #[error("resource `{resource}` was skipped: {cause}")]
    Upstream {
        resource: String,
        cause: Box<ResolutionFailure>,
    },

    #[error("resource `{resource}` produced no output `{output}`")]
    MissingOutput { resource: String, output: String },

    #[error("resource `{0}` was never applied")]
    NotApplied(String),

    #[error("invoke `{function}` failed: {message}")]
    Invoke { function: String, message: String },

    #[error("transformation failed: {0}")]
    Transform(String),
}

impl ResolutionFailure {
    /// The descriptor or function whose remote call failed.
    ///
    /// `None` when nothing failed remotely: a missing output, an unapplied
    /// descriptor or a rejected transformation.
    pub fn origin(&self) -> Option<&str> {
        match self {
            Self::Apply { resource, .. } => Some(resource.as_str()),
            Self::Upstream { cause, .. } => cause.origin(),
            Self::Invoke { function, .. } => Some(function.as_str()),
            Self::MissingOutput { .. } | Self::NotApplied(_) | Self::Transform(_) => None,
        }
    }
}

/// A lookup found no match.
///
/// This is a value, not a fault: callers receive it in a `Result` and decide
/// whether absence is a legitimate configuration state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no {kind} matches `{key}`")]
pub struct NotFound {
    pub kind: &'static str,
    pub key: String,
}

impl NotFound {
    pub fn new(kind: &'static str, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

/// Errors reported by a provisioning backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("apply rejected: {0}")]
    Rejected(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
