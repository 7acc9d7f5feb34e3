use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crewdesk_core::{AppError, AppResult, NonEmptyString, PrincipalId, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Permission;
use crate::catalog::{MANAGE_ACTION, SCOPED_RESOURCES};
use crate::scope::{VIEW_ALL_ACTION, VIEW_OWN_ACTION, VIEW_TEAM_ACTION};

/// Identifier of a tenant-defined role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for RoleId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid role id '{value}': {error}")))
    }
}

/// Fixed roles from the enum-based permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyRole {
    /// Tenant administrator.
    Admin,
    /// People manager.
    Manager,
    /// Regular employee.
    Employee,
}

impl LegacyRole {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Employee => "employee",
        }
    }

    /// Returns the fixed permission bundle the role always carried.
    #[must_use]
    pub fn grants(&self) -> Vec<Permission> {
        let scoped_actions: &[&str] = match self {
            Self::Admin => &[VIEW_ALL_ACTION, MANAGE_ACTION],
            Self::Manager => &[VIEW_TEAM_ACTION],
            Self::Employee => &[VIEW_OWN_ACTION],
        };
        let unscoped: &[&str] = match self {
            Self::Admin => &[
                "audit.view",
                "departments.manage",
                "departments.view",
                "notifications.manage",
                "notifications.view",
                "org_chart.view",
                "positions.manage",
                "positions.view",
                "principals.manage",
                "principals.view",
                "roles.manage",
                "roles.view",
            ],
            Self::Manager => &[
                "departments.view",
                "notifications.view",
                "org_chart.view",
                "positions.view",
                "principals.view",
            ],
            Self::Employee => &["notifications.view", "org_chart.view"],
        };

        SCOPED_RESOURCES
            .iter()
            .flat_map(|resource| {
                scoped_actions
                    .iter()
                    .filter_map(move |action| Permission::from_parts(resource, action).ok())
            })
            .chain(
                unscoped
                    .iter()
                    .filter_map(|value| Permission::new(*value).ok()),
            )
            .collect()
    }
}

impl FromStr for LegacyRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "employee" => Ok(Self::Employee),
            _ => Err(AppError::Validation(format!(
                "unknown legacy role value '{value}'"
            ))),
        }
    }
}

/// How a principal obtains its role-derived permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RoleBinding {
    /// Platform operator holding every permission in every tenant.
    SuperAdmin,
    /// Fixed role from the enum-based model.
    Legacy(LegacyRole),
    /// Tenant-defined role from the granular model.
    Assigned(RoleId),
    /// No role; only direct overrides apply.
    Unassigned,
}

impl RoleBinding {
    /// Returns the assigned role id, if the binding references one.
    #[must_use]
    pub fn assigned_role_id(&self) -> Option<RoleId> {
        match self {
            Self::Assigned(role_id) => Some(*role_id),
            _ => None,
        }
    }
}

/// Authenticated actor and directory entry subject to authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: PrincipalId,
    tenant_id: TenantId,
    display_name: NonEmptyString,
    job_title: Option<String>,
    active: bool,
    manager_id: Option<PrincipalId>,
    role_binding: RoleBinding,
    permission_overrides: Vec<Permission>,
}

impl Principal {
    /// Creates an active principal without manager, role or overrides.
    pub fn new(
        id: PrincipalId,
        tenant_id: TenantId,
        display_name: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            tenant_id,
            display_name: NonEmptyString::new(display_name)?,
            job_title: None,
            active: true,
            manager_id: None,
            role_binding: RoleBinding::Unassigned,
            permission_overrides: Vec::new(),
        })
    }

    /// Sets the job title shown in the org chart.
    #[must_use]
    pub fn with_job_title(mut self, job_title: impl Into<String>) -> Self {
        let job_title = job_title.into();
        self.job_title = (!job_title.trim().is_empty()).then_some(job_title);
        self
    }

    /// Sets the raw manager pointer.
    #[must_use]
    pub fn with_manager(mut self, manager_id: Option<PrincipalId>) -> Self {
        self.manager_id = manager_id;
        self
    }

    /// Sets the role binding.
    #[must_use]
    pub fn with_role_binding(mut self, role_binding: RoleBinding) -> Self {
        self.role_binding = role_binding;
        self
    }

    /// Replaces the direct permission overrides.
    #[must_use]
    pub fn with_permission_overrides(
        mut self,
        permission_overrides: impl IntoIterator<Item = Permission>,
    ) -> Self {
        self.permission_overrides = permission_overrides.into_iter().collect();
        self
    }

    /// Sets the active flag.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Returns the principal identifier.
    #[must_use]
    pub fn id(&self) -> PrincipalId {
        self.id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the optional job title.
    #[must_use]
    pub fn job_title(&self) -> Option<&str> {
        self.job_title.as_deref()
    }

    /// Returns whether the principal is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the raw manager pointer, which may dangle or form a cycle.
    #[must_use]
    pub fn manager_id(&self) -> Option<PrincipalId> {
        self.manager_id
    }

    /// Returns the role binding.
    #[must_use]
    pub fn role_binding(&self) -> RoleBinding {
        self.role_binding
    }

    /// Returns directly assigned permissions.
    #[must_use]
    pub fn permission_overrides(&self) -> &[Permission] {
        self.permission_overrides.as_slice()
    }

    /// Returns whether the principal carries the platform super-admin marker.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        matches!(self.role_binding, RoleBinding::SuperAdmin)
    }
}
