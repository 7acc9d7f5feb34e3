//! Access-control domain: permissions, roles, hierarchy and scope.
//!
//! Everything here is synchronous and side-effect free. Callers load a
//! snapshot of principals and roles, then ask these types for decisions.

#![forbid(unsafe_code)]

mod catalog;
mod gate;
mod hierarchy;
mod org_chart;
mod permission;
mod principal;
mod role;
mod scope;
mod security;

pub use catalog::{MANAGE_ACTION, PermissionCatalog, PermissionResource, SCOPED_RESOURCES};
pub use gate::{AccessDecision, AuthorizationGate, DenyReason};
pub use hierarchy::{HierarchyDirectory, creates_manager_cycle};
pub use org_chart::{OrgChartNode, build_forest};
pub use permission::{Permission, PermissionRequirement};
pub use principal::{LegacyRole, Principal, RoleBinding, RoleId};
pub use role::{EffectivePermissions, Role, RoleStore};
pub use scope::{
    ScopeFilter, ScopeResolver, ScopeTier, VIEW_ALL_ACTION, VIEW_OWN_ACTION, VIEW_TEAM_ACTION,
};
pub use security::AuditAction;
