use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use crewdesk_application::CreateRoleInput;
use crewdesk_core::{ActorIdentity, PrincipalId};
use crewdesk_domain::{RoleBinding, RoleId};

use crate::dto::{
    AssignRoleBindingRequest, AuditLogEntryResponse, AuditLogQueryParams, CreateRoleRequest,
    RoleResponse, SetPermissionOverridesRequest, UpdateRolePermissionsRequest, parse_permissions,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .security_admin_service
        .list_roles(&actor)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .security_admin_service
        .create_role(
            &actor,
            CreateRoleInput {
                name: payload.name,
                permissions: parse_permissions(&payload.permissions)?,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn update_role_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(role_id): Path<String>,
    Json(payload): Json<UpdateRolePermissionsRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .security_admin_service
        .replace_role_permissions(
            &actor,
            RoleId::from_str(role_id.as_str())?,
            parse_permissions(&payload.permissions)?,
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(role_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .delete_role(&actor, RoleId::from_str(role_id.as_str())?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_role_binding_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(principal_id): Path<String>,
    Json(payload): Json<AssignRoleBindingRequest>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .assign_role_binding(
            &actor,
            PrincipalId::from_str(principal_id.as_str())?,
            RoleBinding::try_from(payload)?,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_permission_overrides_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(principal_id): Path<String>,
    Json(payload): Json<SetPermissionOverridesRequest>,
) -> ApiResult<Json<Vec<String>>> {
    let stored = state
        .security_admin_service
        .set_permission_overrides(
            &actor,
            PrincipalId::from_str(principal_id.as_str())?,
            parse_permissions(&payload.permissions)?,
        )
        .await?;

    Ok(Json(
        stored
            .iter()
            .map(|permission| permission.as_str().to_owned())
            .collect(),
    ))
}

pub async fn list_audit_log_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Query(query): Query<AuditLogQueryParams>,
) -> ApiResult<Json<Vec<AuditLogEntryResponse>>> {
    let entries = state
        .security_admin_service
        .list_audit_log(&actor, query.into())
        .await?
        .into_iter()
        .map(AuditLogEntryResponse::from)
        .collect();

    Ok(Json(entries))
}
