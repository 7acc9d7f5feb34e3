use std::collections::{BTreeMap, BTreeSet};

use crewdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::Permission;
use crate::scope::ScopeTier;

/// Resources whose records are owned by a principal and therefore scoped by tier.
pub const SCOPED_RESOURCES: &[&str] = &[
    "attendance",
    "budget",
    "contracts",
    "expenses",
    "leaves",
    "performance",
    "tasks",
    "training",
];

/// Action granting full control over a scoped resource, including every tier.
pub const MANAGE_ACTION: &str = "manage";

const UNSCOPED_PERMISSIONS: &[&str] = &[
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
];

/// Permissions of one resource, for catalog display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResource {
    /// Resource name shared by the grouped permissions.
    pub resource: String,
    /// Permissions in storage order.
    pub permissions: Vec<Permission>,
}

/// Registry of every permission the platform knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCatalog {
    permissions: BTreeSet<Permission>,
}

impl PermissionCatalog {
    /// Creates a catalog from an explicit permission list.
    #[must_use]
    pub fn new(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Returns the catalog seeded at deployment.
    #[must_use]
    pub fn builtin() -> Self {
        let scoped = SCOPED_RESOURCES.iter().flat_map(|resource| {
            ScopeTier::ALL_TIERS
                .iter()
                .map(move |tier| tier.permission_action().to_owned())
                .chain(std::iter::once(MANAGE_ACTION.to_owned()))
                .filter_map(move |action| Permission::from_parts(resource, action.as_str()).ok())
        });
        let unscoped = UNSCOPED_PERMISSIONS
            .iter()
            .filter_map(|value| Permission::new(*value).ok());

        Self::new(scoped.chain(unscoped))
    }

    /// Returns a copy of the catalog extended with one more permission.
    #[must_use]
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    /// Returns every permission in a stable order.
    pub fn list_all(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    /// Returns whether the identifier is registered.
    #[must_use]
    pub fn exists(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }

    /// Returns whether a raw identifier is registered.
    #[must_use]
    pub fn exists_str(&self, value: &str) -> bool {
        Permission::new(value).is_ok_and(|permission| self.exists(&permission))
    }

    /// Returns the number of registered permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Groups permissions by resource for display.
    #[must_use]
    pub fn resources(&self) -> Vec<PermissionResource> {
        let mut grouped: BTreeMap<&str, Vec<Permission>> = BTreeMap::new();
        for permission in &self.permissions {
            grouped
                .entry(permission.resource())
                .or_default()
                .push(permission.clone());
        }

        grouped
            .into_iter()
            .map(|(resource, permissions)| PermissionResource {
                resource: resource.to_owned(),
                permissions,
            })
            .collect()
    }

    /// Ensures every permission is registered.
    pub fn validate<'a>(&self, permissions: impl IntoIterator<Item = &'a Permission>) -> AppResult<()> {
        let unknown: Vec<&str> = permissions
            .into_iter()
            .filter(|permission| !self.exists(permission))
            .map(Permission::as_str)
            .collect();

        if unknown.is_empty() {
            return Ok(());
        }

        Err(AppError::Validation(format!(
            "unknown permission(s): {}",
            unknown.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::{PermissionCatalog, SCOPED_RESOURCES, UNSCOPED_PERMISSIONS};
    use crate::Permission;

    #[test]
    fn builtin_catalog_parses_every_seed() {
        let catalog = PermissionCatalog::builtin();
        assert_eq!(
            catalog.len(),
            SCOPED_RESOURCES.len() * 4 + UNSCOPED_PERMISSIONS.len()
        );
    }

    #[test]
    fn builtin_catalog_contains_scope_tiers() {
        let catalog = PermissionCatalog::builtin();
        assert!(catalog.exists_str("leaves.view_own"));
        assert!(catalog.exists_str("leaves.view_team"));
        assert!(catalog.exists_str("leaves.view_all"));
        assert!(catalog.exists_str("leaves.manage"));
        assert!(!catalog.exists_str("leaves.approve"));
    }

    #[test]
    fn resources_group_once_per_resource() {
        let catalog = PermissionCatalog::builtin();
        let resources = catalog.resources();

        let leaves = resources.iter().find(|group| group.resource == "leaves");
        assert!(matches!(leaves, Some(group) if group.permissions.len() == 4));

        let names: Vec<&str> = resources.iter().map(|group| group.resource.as_str()).collect();
        let mut deduplicated = names.clone();
        deduplicated.dedup();
        assert_eq!(names, deduplicated);
    }

    #[test]
    fn nested_resources_are_not_split() {
        let permissions: Vec<Permission> = ["a.b.c", "a.b.c.d", "a.b.d"]
            .into_iter()
            .filter_map(|value| Permission::new(value).ok())
            .collect();
        assert_eq!(permissions.len(), 3);

        let grouped: Vec<(String, Vec<String>)> = PermissionCatalog::new(permissions)
            .resources()
            .into_iter()
            .map(|group| {
                let actions = group
                    .permissions
                    .iter()
                    .map(|permission| permission.as_str().to_owned())
                    .collect();
                (group.resource, actions)
            })
            .collect();

        assert_eq!(
            grouped,
            vec![
                (
                    "a.b".to_owned(),
                    vec!["a.b.c".to_owned(), "a.b.d".to_owned()]
                ),
                ("a.b.c".to_owned(), vec!["a.b.c.d".to_owned()]),
            ]
        );
    }

    #[test]
    fn validate_reports_unknown_permissions() {
        let catalog = PermissionCatalog::builtin();
        let known = Permission::new("roles.manage");
        let unknown = Permission::new("payroll.run");
        let (Ok(known), Ok(unknown)) = (known, unknown) else {
            panic!("test permissions should parse");
        };

        assert!(catalog.validate([&known]).is_ok());
        let error = catalog.validate([&known, &unknown]);
        assert!(matches!(error, Err(ref value) if value.to_string().contains("payroll.run")));
    }

    #[test]
    fn catalog_growth_is_additive() {
        let Ok(permission) = Permission::new("payroll.run") else {
            panic!("permission should parse");
        };
        let before = PermissionCatalog::builtin();
        let after = before.clone().with_permission(permission.clone());

        assert_eq!(after.len(), before.len() + 1);
        assert!(before.list_all().all(|existing| after.exists(existing)));
    }
}
