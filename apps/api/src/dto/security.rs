use std::str::FromStr;

use crewdesk_application::AuditLogEntry;
use crewdesk_core::AppError;
use crewdesk_domain::{LegacyRole, Role, RoleBinding, RoleId};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::permission_strings;

/// Incoming payload for custom role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub name: String,
    pub permissions: Vec<String>,
}

/// Incoming payload replacing a role's grants.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/update-role-permissions-request.ts"
)]
pub struct UpdateRolePermissionsRequest {
    pub permissions: Vec<String>,
}

/// Incoming payload replacing a principal's direct overrides.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/set-permission-overrides-request.ts"
)]
pub struct SetPermissionOverridesRequest {
    pub permissions: Vec<String>,
}

/// Incoming payload for role binding changes.
///
/// `kind` is one of `super_admin`, `legacy`, `assigned` or `unassigned`.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/assign-role-binding-request.ts"
)]
pub struct AssignRoleBindingRequest {
    pub kind: String,
    pub legacy_role: Option<String>,
    pub role_id: Option<String>,
}

impl TryFrom<AssignRoleBindingRequest> for RoleBinding {
    type Error = AppError;

    fn try_from(value: AssignRoleBindingRequest) -> Result<Self, Self::Error> {
        match (value.kind.as_str(), value.legacy_role, value.role_id) {
            ("super_admin", None, None) => Ok(Self::SuperAdmin),
            ("unassigned", None, None) => Ok(Self::Unassigned),
            ("legacy", Some(legacy_role), None) => {
                LegacyRole::from_str(legacy_role.as_str()).map(Self::Legacy)
            }
            ("assigned", None, Some(role_id)) => RoleId::from_str(role_id.as_str()).map(Self::Assigned),
            (kind, _, _) => Err(AppError::Validation(format!(
                "invalid role binding of kind '{kind}'"
            ))),
        }
    }
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub is_system: bool,
    pub permissions: Vec<String>,
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            role_id: value.id().to_string(),
            name: value.name().to_owned(),
            is_system: value.is_system(),
            permissions: permission_strings(value.permissions()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuditLogQueryParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub action: Option<String>,
    pub subject: Option<String>,
}

impl From<AuditLogQueryParams> for crewdesk_application::AuditLogQuery {
    fn from(value: AuditLogQueryParams) -> Self {
        Self {
            limit: value.limit.unwrap_or(50),
            offset: value.offset.unwrap_or(0),
            action: value.action,
            subject: value.subject,
        }
    }
}

/// API representation of an audit log entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/audit-log-entry-response.ts"
)]
pub struct AuditLogEntryResponse {
    pub event_id: String,
    pub subject: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub detail: Option<String>,
    pub created_at: String,
}

impl From<AuditLogEntry> for AuditLogEntryResponse {
    fn from(value: AuditLogEntry) -> Self {
        Self {
            event_id: value.event_id,
            subject: value.subject,
            action: value.action,
            resource_type: value.resource_type,
            resource_id: value.resource_id,
            detail: value.detail,
            created_at: value.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use crewdesk_core::AppError;
    use crewdesk_domain::{LegacyRole, RoleBinding, RoleId};

    use super::AssignRoleBindingRequest;

    fn request(kind: &str, legacy_role: Option<&str>, role_id: Option<&str>) -> AssignRoleBindingRequest {
        AssignRoleBindingRequest {
            kind: kind.to_owned(),
            legacy_role: legacy_role.map(str::to_owned),
            role_id: role_id.map(str::to_owned),
        }
    }

    #[test]
    fn binding_requests_convert_to_role_bindings() {
        let role_id = RoleId::new();

        assert!(matches!(
            RoleBinding::try_from(request("legacy", Some("manager"), None)),
            Ok(RoleBinding::Legacy(LegacyRole::Manager))
        ));
        assert!(matches!(
            RoleBinding::try_from(request("assigned", None, Some(role_id.to_string().as_str()))),
            Ok(RoleBinding::Assigned(parsed)) if parsed == role_id
        ));
        assert!(matches!(
            RoleBinding::try_from(request("unassigned", None, None)),
            Ok(RoleBinding::Unassigned)
        ));
    }

    #[test]
    fn mismatched_binding_fields_are_rejected() {
        for invalid in [
            request("legacy", None, None),
            request("assigned", Some("admin"), None),
            request("super_admin", Some("admin"), None),
            request("owner", None, None),
        ] {
            assert!(matches!(
                RoleBinding::try_from(invalid),
                Err(AppError::Validation(_))
            ));
        }
    }
}
