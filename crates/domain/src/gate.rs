use crewdesk_core::TenantId;
use serde::{Deserialize, Serialize};

use crate::{EffectivePermissions, Permission, PermissionRequirement, Principal};

/// Machine-readable reason attached to a denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
    /// The actor holds none of the required permissions.
    MissingPermission {
        /// Alternatives that would have satisfied the check.
        required: Vec<Permission>,
    },
    /// The actor belongs to a different tenant than the record.
    TenantViolation {
        /// Tenant of the acting principal.
        actor_tenant: TenantId,
        /// Tenant of the requested record.
        resource_tenant: TenantId,
    },
    /// The actor is deactivated.
    InactivePrincipal,
}

impl DenyReason {
    /// Returns a stable code for audit records.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingPermission { .. } => "missing_permission",
            Self::TenantViolation { .. } => "tenant_violation",
            Self::InactivePrincipal => "inactive_principal",
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The operation may proceed.
    Allow,
    /// The operation must not proceed.
    Deny(DenyReason),
}

impl AccessDecision {
    /// Returns whether the decision allows the operation.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns the denial reason, if any.
    #[must_use]
    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            Self::Allow => None,
            Self::Deny(reason) => Some(reason),
        }
    }
}

/// Single enforcement point for permission and tenant checks.
///
/// Every function is pure. The super-admin bypass lives only here.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGate;

impl AuthorizationGate {
    /// Checks that the principal holds at least one required permission.
    #[must_use]
    pub fn authorize(
        principal: &Principal,
        effective: &EffectivePermissions,
        requirement: &PermissionRequirement,
    ) -> AccessDecision {
        if !principal.is_active() {
            return AccessDecision::Deny(DenyReason::InactivePrincipal);
        }
        if principal.is_super_admin() {
            return AccessDecision::Allow;
        }

        if effective.satisfies(requirement) {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny(DenyReason::MissingPermission {
                required: requirement.permissions().to_vec(),
            })
        }
    }

    /// Checks that the principal may touch records of `resource_tenant`.
    ///
    /// Only an active super-admin crosses tenants.
    #[must_use]
    pub fn authorize_tenant(principal: &Principal, resource_tenant: TenantId) -> AccessDecision {
        let crosses_tenants = principal.is_super_admin() && principal.is_active();
        if crosses_tenants || principal.tenant_id() == resource_tenant {
            return AccessDecision::Allow;
        }

        AccessDecision::Deny(DenyReason::TenantViolation {
            actor_tenant: principal.tenant_id(),
            resource_tenant,
        })
    }

    /// Runs the permission check, then the tenant isolation check.
    #[must_use]
    pub fn authorize_in_tenant(
        principal: &Principal,
        effective: &EffectivePermissions,
        requirement: &PermissionRequirement,
        resource_tenant: TenantId,
    ) -> AccessDecision {
        match Self::authorize(principal, effective, requirement) {
            AccessDecision::Allow => Self::authorize_tenant(principal, resource_tenant),
            denied => denied,
        }
    }
}
