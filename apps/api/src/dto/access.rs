use crewdesk_core::{PrincipalId, TenantId};
use crewdesk_domain::{Permission, PermissionResource, ScopeFilter, ScopeTier};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::permission_strings;

/// Effective permissions of the calling principal.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/effective-permissions-response.ts"
)]
pub struct EffectivePermissionsResponse {
    pub principal_id: String,
    pub tenant_id: String,
    pub permissions: Vec<String>,
}

impl EffectivePermissionsResponse {
    pub fn new(principal_id: PrincipalId, tenant_id: TenantId, permissions: &[Permission]) -> Self {
        Self {
            principal_id: principal_id.to_string(),
            tenant_id: tenant_id.to_string(),
            permissions: permission_strings(permissions),
        }
    }
}

/// Catalog permissions grouped by resource.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-resource-response.ts"
)]
pub struct PermissionResourceResponse {
    pub resource: String,
    pub permissions: Vec<String>,
}

impl From<PermissionResource> for PermissionResourceResponse {
    fn from(value: PermissionResource) -> Self {
        Self {
            permissions: permission_strings(&value.permissions),
            resource: value.resource,
        }
    }
}

/// Optional tier selection for scope resolution. Omitted means widest held.
#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    pub tier: Option<String>,
}

/// Record filter resolved for one scoped resource.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/scope-response.ts"
)]
pub struct ScopeResponse {
    pub resource: String,
    pub tier: String,
    pub tenant_id: String,
    pub unrestricted: bool,
    pub principal_ids: Vec<String>,
}

impl ScopeResponse {
    pub fn new(resource: String, tier: ScopeTier, filter: &ScopeFilter) -> Self {
        Self {
            resource,
            tier: tier.as_str().to_owned(),
            tenant_id: filter.tenant_id().to_string(),
            unrestricted: filter.principal_ids().is_none(),
            principal_ids: filter
                .principal_ids()
                .map(|principal_ids| {
                    principal_ids
                        .iter()
                        .map(|principal_id| principal_id.to_string())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
