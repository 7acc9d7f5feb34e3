use std::collections::BTreeMap;

use crewdesk_core::{AppError, AppResult};
use crewdesk_domain::{
    PermissionCatalog, PermissionRequirement, SCOPED_RESOURCES, ScopeTier,
};

/// Operation identifiers enforced by the access core.
pub mod operations {
    /// Reads the permission catalog.
    pub const PERMISSIONS_CATALOG: &str = "permissions.catalog";
    /// Renders the tenant org chart.
    pub const ORG_CHART_READ: &str = "org_chart.read";
    /// Lists the direct reports of a principal.
    pub const PRINCIPALS_REPORTS: &str = "principals.reports";
    /// Moves a principal under another manager.
    pub const PRINCIPALS_REASSIGN_MANAGER: &str = "principals.reassign_manager";
    /// Replaces the direct permission overrides of a principal.
    pub const PRINCIPALS_SET_OVERRIDES: &str = "principals.set_overrides";
    /// Changes the role binding of a principal.
    pub const PRINCIPALS_ASSIGN_ROLE: &str = "principals.assign_role";
    /// Lists tenant roles.
    pub const ROLES_LIST: &str = "roles.list";
    /// Creates a tenant role.
    pub const ROLES_CREATE: &str = "roles.create";
    /// Replaces a role's permissions.
    pub const ROLES_UPDATE: &str = "roles.update";
    /// Deletes a tenant role.
    pub const ROLES_DELETE: &str = "roles.delete";
    /// Lists tenant audit entries.
    pub const AUDIT_LIST: &str = "audit.list";

    /// Returns the listing operation of a scoped resource.
    #[must_use]
    pub fn scoped_list(resource: &str) -> String {
        format!("{resource}.list")
    }
}

/// Lookup table mapping operation identifiers to their permission requirement.
#[derive(Debug, Clone, Default)]
pub struct OperationPolicy {
    requirements: BTreeMap<String, PermissionRequirement>,
}

impl OperationPolicy {
    /// Creates an empty policy table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the policy table for the built-in operations.
    pub fn builtin() -> AppResult<Self> {
        let mut policy = Self::new();

        policy.declare(
            operations::PERMISSIONS_CATALOG,
            PermissionRequirement::parse(["roles.view", "roles.manage"])?,
        )?;
        policy.declare(
            operations::ORG_CHART_READ,
            PermissionRequirement::parse(["org_chart.view"])?,
        )?;
        policy.declare(
            operations::PRINCIPALS_REPORTS,
            PermissionRequirement::parse(["principals.view", "org_chart.view"])?,
        )?;
        policy.declare(
            operations::PRINCIPALS_REASSIGN_MANAGER,
            PermissionRequirement::parse(["principals.manage"])?,
        )?;
        for operation in [
            operations::PRINCIPALS_SET_OVERRIDES,
            operations::PRINCIPALS_ASSIGN_ROLE,
            operations::ROLES_CREATE,
            operations::ROLES_UPDATE,
            operations::ROLES_DELETE,
        ] {
            policy.declare(operation, PermissionRequirement::parse(["roles.manage"])?)?;
        }
        policy.declare(
            operations::ROLES_LIST,
            PermissionRequirement::parse(["roles.view", "roles.manage"])?,
        )?;
        policy.declare(
            operations::AUDIT_LIST,
            PermissionRequirement::parse(["audit.view"])?,
        )?;

        for resource in SCOPED_RESOURCES {
            policy.declare(
                operations::scoped_list(resource),
                ScopeTier::Own.requirement(resource)?,
            )?;
        }

        Ok(policy)
    }

    /// Declares the requirement of one operation. Operations are declared once.
    pub fn declare(
        &mut self,
        operation: impl Into<String>,
        requirement: PermissionRequirement,
    ) -> AppResult<()> {
        let operation = operation.into();
        if self.requirements.contains_key(&operation) {
            return Err(AppError::Conflict(format!(
                "operation '{operation}' already declares a permission requirement"
            )));
        }

        self.requirements.insert(operation, requirement);
        Ok(())
    }

    /// Returns the requirement of an operation.
    ///
    /// Undeclared operations are refused rather than left open.
    pub fn requirement(&self, operation: &str) -> AppResult<&PermissionRequirement> {
        self.requirements.get(operation).ok_or_else(|| {
            AppError::Forbidden(format!(
                "operation '{operation}' declares no permission requirement"
            ))
        })
    }

    /// Returns every declared operation with its requirement.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PermissionRequirement)> {
        self.requirements
            .iter()
            .map(|(operation, requirement)| (operation.as_str(), requirement))
    }

    /// Ensures every declared permission exists in the catalog.
    pub fn validate(&self, catalog: &PermissionCatalog) -> AppResult<()> {
        for (operation, requirement) in &self.requirements {
            catalog
                .validate(requirement.permissions())
                .map_err(|error| {
                    AppError::Validation(format!(
                        "operation '{operation}' references an unknown permission: {error}"
                    ))
                })?;
        }

        Ok(())
    }
}
