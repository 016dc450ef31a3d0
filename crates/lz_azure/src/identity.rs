//! Managed identities and their role assignments.
//!
//! An [`IdentityBinding`] owns a user-assigned identity plus one role
//! assignment per granted role. Each assignment is named by a random uuid
//! resource so that re-deployments keep a stable assignment name.
//!
//! A role the catalog cannot resolve is not an error: the assignment is simply
//! not declared and its id resolves to an empty string.

use lz_core::{
    Deferred, DeclarationError, Input, Properties, Resource, ResourceOptions, Stack,
};
use tracing::{debug, warn};

use crate::roles::RoleCatalog;
use crate::schema::{RANDOM_UUID, ROLE_ASSIGNMENT, USER_ASSIGNED_IDENTITY};

/// Kind of principal a role is granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalType {
    ServicePrincipal,
    Group,
    User,
}

impl PrincipalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServicePrincipal => "ServicePrincipal",
            Self::Group => "Group",
            Self::User => "User",
        }
    }
}

/// Inputs of a single role assignment.
#[derive(Clone)]
pub struct RoleAssignmentArgs {
    pub role_name: String,
    pub principal_id: Input,
    pub principal_type: PrincipalType,
    pub scope: Input,
}

impl RoleAssignmentArgs {
    pub fn new(
        role_name: impl Into<String>,
        principal_id: impl Into<Input>,
        principal_type: PrincipalType,
        scope: impl Into<Input>,
    ) -> Self {
        Self {
            role_name: role_name.into(),
            principal_id: principal_id.into(),
            principal_type,
            scope: scope.into(),
        }
    }
}

/// Declare `guidRoleAssignment{suffix}` and `roleAssignment{suffix}`.
///
/// Returns the assignment id, or a known empty string when the catalog has no
/// such role.
pub fn assign_role(
    stack: &mut Stack,
    catalog: &dyn RoleCatalog,
    suffix: &str,
    args: RoleAssignmentArgs,
) -> Result<Deferred<String>, DeclarationError> {
    let role_definition_id = match catalog.role_definition_id(&args.role_name) {
        Ok(id) => Some(id),
        Err(not_found) => {
            warn!("Skipping roleAssignment{}: {}", suffix, not_found);
            None
        }
    };

    let assignment = stack.build_if_some(role_definition_id, |stack, role_definition_id| {
        let guid = stack.declare(
            RANDOM_UUID,
            format!("guidRoleAssignment{}", suffix),
            Properties::new(),
            ResourceOptions::new(),
        )?;
        let assignment = stack.declare(
            ROLE_ASSIGNMENT,
            format!("roleAssignment{}", suffix),
            Properties::new()
                .set("principalId", args.principal_id)
                .set("principalType", args.principal_type.as_str())
                .set("roleAssignmentName", guid.output_str("result"))
                .set("roleDefinitionId", role_definition_id)
                .set("scope", args.scope),
            ResourceOptions::new(),
        )?;
        debug!("Granted `{}` via roleAssignment{}", args.role_name, suffix);
        Ok::<_, DeclarationError>(assignment.id())
    })?;

    Ok(assignment
        .map(|branch| branch.into_handle())
        .unwrap_or_else(|| Deferred::known(String::new())))
}

/// A user-assigned identity with its role assignments.
#[derive(Debug, Clone)]
pub struct IdentityBinding {
    identity: Resource,
    assignments: Vec<(String, Deferred<String>)>,
}

impl IdentityBinding {
    pub fn builder(name: impl Into<String>, resource_group_name: impl Into<Input>) -> IdentityBindingBuilder {
        IdentityBindingBuilder {
            name: name.into(),
            resource_group_name: resource_group_name.into(),
            location: None,
            roles: Vec::new(),
        }
    }

    pub fn identity(&self) -> &Resource {
        &self.identity
    }

    pub fn id(&self) -> Deferred<String> {
        self.identity.id()
    }

    pub fn client_id(&self) -> Deferred<String> {
        self.identity.output_str("clientId")
    }

    pub fn principal_id(&self) -> Deferred<String> {
        self.identity.output_str("principalId")
    }

    pub fn tenant_id(&self) -> Deferred<String> {
        self.identity.output_str("tenantId")
    }

    /// Id of the first role assignment; empty when none was declared.
    pub fn role_assignment_id(&self) -> Deferred<String> {
        self.assignments
            .first()
            .map(|(_, id)| id.clone())
            .unwrap_or_else(|| Deferred::known(String::new()))
    }

    /// (role name, assignment id) for every requested role.
    pub fn role_assignments(&self) -> &[(String, Deferred<String>)] {
        &self.assignments
    }
}

pub struct IdentityBindingBuilder {
    name: String,
    resource_group_name: Input,
    location: Option<Input>,
    roles: Vec<(String, Input)>,
}

impl IdentityBindingBuilder {
    pub fn location(mut self, location: impl Into<Input>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Grant `role_name` on `scope`.
    pub fn role(mut self, role_name: impl Into<String>, scope: impl Into<Input>) -> Self {
        self.roles.push((role_name.into(), scope.into()));
        self
    }

    pub fn declare(
        self,
        stack: &mut Stack,
        catalog: &dyn RoleCatalog,
    ) -> Result<IdentityBinding, DeclarationError> {
        let identity = stack.declare(
            USER_ASSIGNED_IDENTITY,
            self.name.clone(),
            Properties::new()
                .set("resourceGroupName", self.resource_group_name)
                .set_opt("location", self.location),
            ResourceOptions::new(),
        )?;

        let mut assignments = Vec::with_capacity(self.roles.len());
        for (i, (role_name, scope)) in self.roles.into_iter().enumerate() {
            let suffix = if i == 0 {
                self.name.clone()
            } else {
                format!("{}/{}", self.name, i)
            };
            let id = assign_role(
                stack,
                catalog,
                &suffix,
                RoleAssignmentArgs::new(
                    role_name.clone(),
                    identity.output_str("principalId"),
                    PrincipalType::ServicePrincipal,
                    scope,
                ),
            )?;
            assignments.push((role_name, id));
        }

        Ok(IdentityBinding {
            identity,
            assignments,
        })
    }
}

/// Declare an identity holding a single role on `scope`.
pub fn bind(
    stack: &mut Stack,
    catalog: &dyn RoleCatalog,
    identity_name: &str,
    resource_group_name: impl Into<Input>,
    role_name: &str,
    scope: impl Into<Input>,
) -> Result<IdentityBinding, DeclarationError> {
    IdentityBinding::builder(identity_name, resource_group_name)
        .role(role_name, scope)
        .declare(stack, catalog)
}
