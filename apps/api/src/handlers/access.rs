use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use crewdesk_core::{ActorIdentity, PrincipalId, TenantId};
use crewdesk_domain::ScopeTier;
use serde::Deserialize;

use crate::dto::{EffectivePermissionsResponse, PermissionResourceResponse, ScopeQuery, ScopeResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn my_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let permissions = state.access_service.effective_permissions(&actor).await?;

    Ok(Json(EffectivePermissionsResponse::new(
        actor.principal_id(),
        actor.tenant_id(),
        &permissions,
    )))
}

pub async fn permission_catalog_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<Vec<PermissionResourceResponse>>> {
    let resources = state
        .security_admin_service
        .permission_catalog(&actor)
        .await?
        .into_iter()
        .map(PermissionResourceResponse::from)
        .collect();

    Ok(Json(resources))
}

pub async fn resolve_scope_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(resource): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<Json<ScopeResponse>> {
    let (tier, filter) = match query.tier.as_deref() {
        Some(tier) => {
            let tier = ScopeTier::from_str(tier)?;
            let filter = state
                .access_service
                .resolve_scope(&actor, resource.as_str(), tier)
                .await?;
            (tier, filter)
        }
        None => {
            state
                .access_service
                .resolve_widest_scope(&actor, resource.as_str())
                .await?
        }
    };

    Ok(Json(ScopeResponse::new(resource, tier, &filter)))
}

#[derive(Debug, Deserialize)]
pub struct RecordAccessQuery {
    pub tenant_id: Option<String>,
}

/// Answers 204 when the actor may read a record owned by `owner_id`.
pub async fn authorize_record_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path((resource, owner_id)): Path<(String, String)>,
    Query(query): Query<RecordAccessQuery>,
) -> ApiResult<StatusCode> {
    let owner_id = PrincipalId::from_str(owner_id.as_str())?;
    let record_tenant = query
        .tenant_id
        .as_deref()
        .map(TenantId::from_str)
        .transpose()?
        .unwrap_or(actor.tenant_id());

    state
        .access_service
        .authorize_record(&actor, resource.as_str(), record_tenant, owner_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
