use crewdesk_core::AppError;
use crewdesk_domain::Permission;
use serde::Serialize;
use ts_rs::TS;

mod access;
mod hierarchy;
mod security;

pub use access::{EffectivePermissionsResponse, PermissionResourceResponse, ScopeQuery, ScopeResponse};
pub use hierarchy::{OrgChartNodeResponse, PrincipalResponse, ReassignManagerRequest};
pub use security::{
    AssignRoleBindingRequest, AuditLogEntryResponse, AuditLogQueryParams, CreateRoleRequest,
    RoleResponse, SetPermissionOverridesRequest, UpdateRolePermissionsRequest,
};

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Parses transport permission strings, rejecting malformed entries.
pub fn parse_permissions(values: &[String]) -> Result<Vec<Permission>, AppError> {
    values
        .iter()
        .map(|value| Permission::new(value.as_str()))
        .collect()
}

fn permission_strings<'a>(permissions: impl IntoIterator<Item = &'a Permission>) -> Vec<String> {
    permissions
        .into_iter()
        .map(|permission| permission.as_str().to_owned())
        .collect()
}
