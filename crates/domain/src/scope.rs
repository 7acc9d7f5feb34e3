use std::collections::BTreeSet;
use std::str::FromStr;

use crewdesk_core::{AppError, AppResult, PrincipalId, TenantId};
use serde::{Deserialize, Serialize};

use crate::catalog::MANAGE_ACTION;
use crate::{HierarchyDirectory, Permission, PermissionRequirement, Principal};

/// Action suffix granting the own tier.
pub const VIEW_OWN_ACTION: &str = "view_own";
/// Action suffix granting the team tier.
pub const VIEW_TEAM_ACTION: &str = "view_team";
/// Action suffix granting the all tier.
pub const VIEW_ALL_ACTION: &str = "view_all";

/// Breadth of records a scoped permission reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeTier {
    /// Records owned by the actor.
    Own,
    /// Records owned by the actor or anyone reporting to them.
    Team,
    /// Every record of the actor's tenant.
    All,
}

impl ScopeTier {
    /// Every tier, narrowest first.
    pub const ALL_TIERS: [ScopeTier; 3] = [ScopeTier::Own, ScopeTier::Team, ScopeTier::All];

    /// Returns a stable storage value for this tier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::Team => "team",
            Self::All => "all",
        }
    }

    /// Returns the action suffix of the permission granting this tier.
    #[must_use]
    pub fn permission_action(&self) -> &'static str {
        match self {
            Self::Own => VIEW_OWN_ACTION,
            Self::Team => VIEW_TEAM_ACTION,
            Self::All => VIEW_ALL_ACTION,
        }
    }

    /// Returns the permission granting exactly this tier on `resource`.
    pub fn permission(&self, resource: &str) -> AppResult<Permission> {
        Permission::from_parts(resource, self.permission_action())
    }

    /// Returns what an actor must hold to request this tier on `resource`.
    ///
    /// A wider tier or `manage` also satisfies a narrower tier.
    pub fn requirement(&self, resource: &str) -> AppResult<PermissionRequirement> {
        let mut alternatives = Vec::new();
        for tier in Self::ALL_TIERS.iter().filter(|tier| *tier >= self) {
            alternatives.push(tier.permission(resource)?);
        }
        alternatives.push(Permission::from_parts(resource, MANAGE_ACTION)?);

        PermissionRequirement::any_of(alternatives)
    }
}

impl FromStr for ScopeTier {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "own" => Ok(Self::Own),
            "team" => Ok(Self::Team),
            "all" => Ok(Self::All),
            _ => Err(AppError::Validation(format!(
                "unknown scope tier '{value}'"
            ))),
        }
    }
}

/// Record filter handed to the data-access layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScopeFilter {
    /// Only records owned by these principals, within the tenant.
    Principals {
        /// Tenant the records must belong to.
        tenant_id: TenantId,
        /// Owners whose records are visible.
        principal_ids: BTreeSet<PrincipalId>,
    },
    /// No owner filter; still bounded to the tenant.
    Unrestricted {
        /// Tenant the records must belong to.
        tenant_id: TenantId,
    },
}

impl ScopeFilter {
    /// Returns the tenant bounding the filter.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        match self {
            Self::Principals { tenant_id, .. } | Self::Unrestricted { tenant_id } => *tenant_id,
        }
    }

    /// Returns whether a record owned by `owner` in `tenant_id` passes the filter.
    #[must_use]
    pub fn permits(&self, tenant_id: TenantId, owner: PrincipalId) -> bool {
        if tenant_id != self.tenant_id() {
            return false;
        }

        match self {
            Self::Principals { principal_ids, .. } => principal_ids.contains(&owner),
            Self::Unrestricted { .. } => true,
        }
    }

    /// Returns the explicit id set, or `None` when unrestricted.
    #[must_use]
    pub fn principal_ids(&self) -> Option<&BTreeSet<PrincipalId>> {
        match self {
            Self::Principals { principal_ids, .. } => Some(principal_ids),
            Self::Unrestricted { .. } => None,
        }
    }
}

/// Turns an already-authorized tier into a concrete filter.
///
/// The resolver does not check permissions; callers ask the gate first.
#[derive(Debug, Clone, Copy)]
pub struct ScopeResolver<'a> {
    directory: &'a HierarchyDirectory,
}

impl<'a> ScopeResolver<'a> {
    /// Creates a resolver over a directory snapshot.
    #[must_use]
    pub fn new(directory: &'a HierarchyDirectory) -> Self {
        Self { directory }
    }

    /// Resolves `tier` for `principal`.
    #[must_use]
    pub fn resolve(&self, principal: &Principal, tier: ScopeTier) -> ScopeFilter {
        let tenant_id = principal.tenant_id();

        match tier {
            ScopeTier::Own => ScopeFilter::Principals {
                tenant_id,
                principal_ids: BTreeSet::from([principal.id()]),
            },
            ScopeTier::Team => {
                let mut principal_ids = if self.directory.tenant_id() == tenant_id {
                    self.directory.team_members(principal.id())
                } else {
                    BTreeSet::new()
                };
                principal_ids.insert(principal.id());

                ScopeFilter::Principals {
                    tenant_id,
                    principal_ids,
                }
            }
            ScopeTier::All => ScopeFilter::Unrestricted { tenant_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::str::FromStr;

    use crewdesk_core::{PrincipalId, TenantId};
    use proptest::prelude::*;

    use super::{ScopeFilter, ScopeResolver, ScopeTier};
    use crate::{HierarchyDirectory, Principal};

    fn principal(tenant_id: TenantId, name: &str, manager: Option<PrincipalId>) -> Principal {
        match Principal::new(PrincipalId::new(), tenant_id, name) {
            Ok(value) => value.with_manager(manager),
            Err(error) => panic!("invalid test principal: {error}"),
        }
    }

    #[test]
    fn tier_parses_storage_value() {
        for tier in ScopeTier::ALL_TIERS {
            assert!(matches!(ScopeTier::from_str(tier.as_str()), Ok(value) if value == tier));
        }
        assert!(ScopeTier::from_str("company").is_err());
    }

    #[test]
    fn wider_tiers_and_manage_satisfy_narrower_requirements() {
        let Ok(requirement) = ScopeTier::Team.requirement("leaves") else {
            panic!("requirement should build");
        };
        let accepted: Vec<&str> = requirement
            .permissions()
            .iter()
            .map(|permission| permission.as_str())
            .collect();

        assert_eq!(
            accepted,
            vec!["leaves.view_team", "leaves.view_all", "leaves.manage"]
        );
    }

    #[test]
    fn own_tier_ignores_the_hierarchy() {
        let tenant_id = TenantId::new();
        let manager = principal(tenant_id, "Mia", None);
        let report = principal(tenant_id, "Xavier", Some(manager.id()));
        let principals = vec![manager.clone(), report];
        let directory = HierarchyDirectory::new(tenant_id, &principals);

        let scope = ScopeResolver::new(&directory).resolve(&manager, ScopeTier::Own);

        assert_eq!(
            scope,
            ScopeFilter::Principals {
                tenant_id,
                principal_ids: BTreeSet::from([manager.id()]),
            }
        );
    }

    #[test]
    fn team_tier_includes_manager_and_reports() {
        let tenant_id = TenantId::new();
        let manager = principal(tenant_id, "Mia", None);
        let first = principal(tenant_id, "Xavier", Some(manager.id()));
        let second = principal(tenant_id, "Yara", Some(manager.id()));
        let principals = vec![manager.clone(), first.clone(), second.clone()];
        let directory = HierarchyDirectory::new(tenant_id, &principals);
        let resolver = ScopeResolver::new(&directory);

        let manager_scope = resolver.resolve(&manager, ScopeTier::Team);
        let report_scope = resolver.resolve(&first, ScopeTier::Team);

        assert_eq!(
            manager_scope.principal_ids(),
            Some(&BTreeSet::from([manager.id(), first.id(), second.id()]))
        );
        assert_eq!(
            report_scope.principal_ids(),
            Some(&BTreeSet::from([first.id()]))
        );
    }

    #[test]
    fn team_tier_is_transitive() {
        let tenant_id = TenantId::new();
        let director = principal(tenant_id, "Dana", None);
        let manager = principal(tenant_id, "Mia", Some(director.id()));
        let engineer = principal(tenant_id, "Eli", Some(manager.id()));
        let principals = vec![director.clone(), manager.clone(), engineer.clone()];
        let directory = HierarchyDirectory::new(tenant_id, &principals);

        let scope = ScopeResolver::new(&directory).resolve(&director, ScopeTier::Team);

        assert_eq!(
            scope.principal_ids(),
            Some(&BTreeSet::from([director.id(), manager.id(), engineer.id()]))
        );
    }

    #[test]
    fn team_tier_survives_cycles() {
        let tenant_id = TenantId::new();
        let first_id = PrincipalId::new();
        let second_id = PrincipalId::new();
        let principals = vec![
            match Principal::new(first_id, tenant_id, "A") {
                Ok(value) => value.with_manager(Some(second_id)),
                Err(error) => panic!("{error}"),
            },
            match Principal::new(second_id, tenant_id, "B") {
                Ok(value) => value.with_manager(Some(first_id)),
                Err(error) => panic!("{error}"),
            },
        ];
        let directory = HierarchyDirectory::new(tenant_id, &principals);

        let scope = ScopeResolver::new(&directory).resolve(&principals[0], ScopeTier::Team);

        assert_eq!(scope.principal_ids(), Some(&BTreeSet::from([first_id])));
    }

    #[test]
    fn team_tier_against_foreign_directory_is_own_only() {
        let tenant_id = TenantId::new();
        let manager = principal(tenant_id, "Mia", None);
        let report = principal(tenant_id, "Xavier", Some(manager.id()));
        let principals = vec![manager.clone(), report];
        let foreign_directory = HierarchyDirectory::new(TenantId::new(), &principals);

        let scope = ScopeResolver::new(&foreign_directory).resolve(&manager, ScopeTier::Team);

        assert_eq!(scope.principal_ids(), Some(&BTreeSet::from([manager.id()])));
    }

    #[test]
    fn all_tier_stays_inside_the_tenant() {
        let tenant_id = TenantId::new();
        let actor = principal(tenant_id, "Ada", None);
        let principals = vec![actor.clone()];
        let directory = HierarchyDirectory::new(tenant_id, &principals);

        let scope = ScopeResolver::new(&directory).resolve(&actor, ScopeTier::All);

        assert_eq!(scope, ScopeFilter::Unrestricted { tenant_id });
        assert!(scope.permits(tenant_id, PrincipalId::new()));
        assert!(!scope.permits(TenantId::new(), actor.id()));
    }

    proptest! {
        #[test]
        fn team_scope_is_idempotent(size in 1usize..25, seed in proptest::collection::vec(0usize..25, 25)) {
            let tenant_id = TenantId::new();
            let ids: Vec<PrincipalId> = (0..size).map(|_| PrincipalId::new()).collect();
            let principals: Vec<Principal> = ids
                .iter()
                .enumerate()
                .filter_map(|(position, id)| {
                    let manager = ids.get(seed[position]).copied();
                    Principal::new(*id, tenant_id, format!("P{position}"))
                        .ok()
                        .map(|value| value.with_manager(manager))
                })
                .collect();
            let directory = HierarchyDirectory::new(tenant_id, &principals);
            let resolver = ScopeResolver::new(&directory);

            for principal in &principals {
                let first = resolver.resolve(principal, ScopeTier::Team);
                let second = resolver.resolve(principal, ScopeTier::Team);
                prop_assert_eq!(&first, &second);
                prop_assert!(first.permits(tenant_id, principal.id()));
                let own = resolver.resolve(principal, ScopeTier::Own);
                let expected = BTreeSet::from([principal.id()]);
                prop_assert_eq!(own.principal_ids(), Some(&expected));
            }
        }
    }
}
