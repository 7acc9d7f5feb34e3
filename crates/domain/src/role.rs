use std::collections::{BTreeSet, HashMap};

use crewdesk_core::{AppResult, NonEmptyString, TenantId};
use serde::{Deserialize, Serialize};

use crate::{Permission, PermissionCatalog, PermissionRequirement, Principal, RoleBinding, RoleId};

/// Tenant-defined bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    tenant_id: TenantId,
    name: NonEmptyString,
    is_system: bool,
    permissions: BTreeSet<Permission>,
}

impl Role {
    /// Creates a role definition.
    pub fn new(
        id: RoleId,
        tenant_id: TenantId,
        name: impl Into<String>,
        is_system: bool,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            tenant_id,
            name: NonEmptyString::new(name)?,
            is_system,
            permissions: permissions.into_iter().collect(),
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the unique role name in tenant scope.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns whether the role is system-managed and protected from deletion.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    /// Returns the stored permissions, including ones the catalog no longer knows.
    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }

    /// Returns a copy with its permission set replaced.
    #[must_use]
    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = permissions.into_iter().collect();
        self
    }
}

/// Permissions a principal effectively holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectivePermissions {
    /// Wildcard held by the platform super-admin, including future permissions.
    All,
    /// Concrete set of catalog permissions.
    Granted(BTreeSet<Permission>),
}

impl EffectivePermissions {
    /// Returns whether the permission is held.
    #[must_use]
    pub fn contains(&self, permission: &Permission) -> bool {
        match self {
            Self::All => true,
            Self::Granted(permissions) => permissions.contains(permission),
        }
    }

    /// Returns whether at least one alternative of the requirement is held.
    #[must_use]
    pub fn satisfies(&self, requirement: &PermissionRequirement) -> bool {
        requirement.is_satisfied_by(|permission| self.contains(permission))
    }

    /// Lists held permissions, expanding the wildcard against the catalog.
    #[must_use]
    pub fn to_list(&self, catalog: &PermissionCatalog) -> Vec<Permission> {
        match self {
            Self::All => catalog.list_all().cloned().collect(),
            Self::Granted(permissions) => permissions.iter().cloned().collect(),
        }
    }
}

/// Snapshot resolving principals to their effective permissions.
#[derive(Debug, Clone)]
pub struct RoleStore<'a> {
    catalog: &'a PermissionCatalog,
    roles: HashMap<RoleId, &'a Role>,
}

impl<'a> RoleStore<'a> {
    /// Creates a store over the catalog and the known roles.
    #[must_use]
    pub fn new(catalog: &'a PermissionCatalog, roles: impl IntoIterator<Item = &'a Role>) -> Self {
        Self {
            catalog,
            roles: roles.into_iter().map(|role| (role.id(), role)).collect(),
        }
    }

    /// Returns a role by id.
    #[must_use]
    pub fn role(&self, role_id: RoleId) -> Option<&'a Role> {
        self.roles.get(&role_id).copied()
    }

    /// Resolves the principal's effective permissions.
    ///
    /// Role and override grants are unioned. A dangling or foreign-tenant role
    /// reference contributes nothing. Permissions missing from the catalog are
    /// dropped from the result.
    #[must_use]
    pub fn effective_permissions(&self, principal: &Principal) -> EffectivePermissions {
        let role_grants: Vec<Permission> = match principal.role_binding() {
            RoleBinding::SuperAdmin => return EffectivePermissions::All,
            RoleBinding::Legacy(legacy_role) => legacy_role.grants(),
            RoleBinding::Assigned(role_id) => self
                .role(role_id)
                .filter(|role| role.tenant_id() == principal.tenant_id())
                .map(|role| role.permissions().iter().cloned().collect())
                .unwrap_or_default(),
            RoleBinding::Unassigned => Vec::new(),
        };

        let granted = role_grants
            .into_iter()
            .chain(principal.permission_overrides().iter().cloned())
            .filter(|permission| self.catalog.exists(permission))
            .collect();

        EffectivePermissions::Granted(granted)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crewdesk_core::{PrincipalId, TenantId};

    use super::{EffectivePermissions, Role, RoleStore};
    use crate::{LegacyRole, Permission, PermissionCatalog, Principal, RoleBinding, RoleId};

    fn permission(value: &str) -> Permission {
        match Permission::new(value) {
            Ok(permission) => permission,
            Err(error) => panic!("invalid test permission: {error}"),
        }
    }

    fn principal(tenant_id: TenantId) -> Principal {
        match Principal::new(PrincipalId::new(), tenant_id, "Ada") {
            Ok(value) => value,
            Err(error) => panic!("invalid test principal: {error}"),
        }
    }

    fn role(tenant_id: TenantId, permissions: &[&str]) -> Role {
        match Role::new(
            RoleId::new(),
            tenant_id,
            "hr_officer",
            false,
            permissions.iter().map(|value| permission(value)),
        ) {
            Ok(value) => value,
            Err(error) => panic!("invalid test role: {error}"),
        }
    }

    #[test]
    fn super_admin_resolves_to_wildcard() {
        let catalog = PermissionCatalog::builtin();
        let store = RoleStore::new(&catalog, []);
        let actor = principal(TenantId::new()).with_role_binding(RoleBinding::SuperAdmin);

        let effective = store.effective_permissions(&actor);

        assert_eq!(effective, EffectivePermissions::All);
        assert!(effective.contains(&permission("payroll.run")));
        assert_eq!(effective.to_list(&catalog).len(), catalog.len());
    }

    #[test]
    fn assigned_role_and_overrides_are_unioned() {
        let tenant_id = TenantId::new();
        let catalog = PermissionCatalog::builtin();
        let assigned = role(tenant_id, &["leaves.view_team", "expenses.view_own"]);
        let store = RoleStore::new(&catalog, [&assigned]);
        let actor = principal(tenant_id)
            .with_role_binding(RoleBinding::Assigned(assigned.id()))
            .with_permission_overrides([permission("expenses.view_own"), permission("audit.view")]);

        let effective = store.effective_permissions(&actor);

        assert_eq!(
            effective,
            EffectivePermissions::Granted(BTreeSet::from([
                permission("audit.view"),
                permission("expenses.view_own"),
                permission("leaves.view_team"),
            ]))
        );
    }

    #[test]
    fn legacy_role_and_overrides_are_unioned() {
        let catalog = PermissionCatalog::builtin();
        let store = RoleStore::new(&catalog, []);
        let actor = principal(TenantId::new())
            .with_role_binding(RoleBinding::Legacy(LegacyRole::Employee))
            .with_permission_overrides([permission("budget.view_all")]);

        let effective = store.effective_permissions(&actor);

        assert!(effective.contains(&permission("leaves.view_own")));
        assert!(effective.contains(&permission("budget.view_all")));
        assert!(!effective.contains(&permission("leaves.view_team")));
    }

    #[test]
    fn dangling_role_keeps_only_overrides() {
        let catalog = PermissionCatalog::builtin();
        let store = RoleStore::new(&catalog, []);
        let actor = principal(TenantId::new())
            .with_role_binding(RoleBinding::Assigned(RoleId::new()))
            .with_permission_overrides([permission("tasks.view_own")]);

        assert_eq!(
            store.effective_permissions(&actor),
            EffectivePermissions::Granted(BTreeSet::from([permission("tasks.view_own")]))
        );
    }

    #[test]
    fn foreign_tenant_role_contributes_nothing() {
        let catalog = PermissionCatalog::builtin();
        let foreign = role(TenantId::new(), &["leaves.view_all"]);
        let store = RoleStore::new(&catalog, [&foreign]);
        let actor = principal(TenantId::new()).with_role_binding(RoleBinding::Assigned(foreign.id()));

        assert_eq!(
            store.effective_permissions(&actor),
            EffectivePermissions::Granted(BTreeSet::new())
        );
    }

    #[test]
    fn permissions_removed_from_catalog_are_excluded_silently() {
        let tenant_id = TenantId::new();
        let shrunk_catalog = PermissionCatalog::new([permission("leaves.view_own")]);
        let stale = role(tenant_id, &["leaves.view_own", "leaves.retired_action"]);
        let store = RoleStore::new(&shrunk_catalog, [&stale]);
        let actor = principal(tenant_id).with_role_binding(RoleBinding::Assigned(stale.id()));

        assert_eq!(
            store.effective_permissions(&actor),
            EffectivePermissions::Granted(BTreeSet::from([permission("leaves.view_own")]))
        );
        assert_eq!(stale.permissions().len(), 2);
    }
}
