use serde::{Deserialize, Serialize};

use crate::DenyReason;

/// Stable audit actions emitted by access-control use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when an actor lacks every required permission.
    AccessDeniedMissingPermission,
    /// Emitted when an actor reaches for another tenant's records.
    AccessDeniedTenantViolation,
    /// Emitted when a deactivated actor attempts an operation.
    AccessDeniedInactivePrincipal,
    /// Emitted when a custom role is created.
    SecurityRoleCreated,
    /// Emitted when a role's permission set is replaced.
    SecurityRolePermissionsUpdated,
    /// Emitted when a custom role is deleted.
    SecurityRoleDeleted,
    /// Emitted when a role binding of a principal changes.
    SecurityRoleAssigned,
    /// Emitted when direct permission overrides of a principal change.
    SecurityOverridesUpdated,
    /// Emitted when a principal is moved under a new manager.
    HierarchyManagerReassigned,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDeniedMissingPermission => "access.denied.missing_permission",
            Self::AccessDeniedTenantViolation => "access.denied.tenant_violation",
            Self::AccessDeniedInactivePrincipal => "access.denied.inactive_principal",
            Self::SecurityRoleCreated => "security.role.created",
            Self::SecurityRolePermissionsUpdated => "security.role.permissions_updated",
            Self::SecurityRoleDeleted => "security.role.deleted",
            Self::SecurityRoleAssigned => "security.role.assigned",
            Self::SecurityOverridesUpdated => "security.overrides.updated",
            Self::HierarchyManagerReassigned => "hierarchy.manager.reassigned",
        }
    }

    /// Returns the audit action recording a denial.
    #[must_use]
    pub fn for_denial(reason: &DenyReason) -> Self {
        match reason {
            DenyReason::MissingPermission { .. } => Self::AccessDeniedMissingPermission,
            DenyReason::TenantViolation { .. } => Self::AccessDeniedTenantViolation,
            DenyReason::InactivePrincipal => Self::AccessDeniedInactivePrincipal,
        }
    }
}
