use axum::Extension;
use axum::extract::{Path, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use crewdesk_application::operations;
use crewdesk_core::{ActorIdentity, AppError, AppResult, PrincipalId, TenantId};

use crate::error::ApiResult;
use crate::state::AppState;

/// Principal id asserted by the authenticating gateway.
pub const PRINCIPAL_HEADER: &str = "x-principal-id";
/// Tenant id asserted by the authenticating gateway.
pub const TENANT_HEADER: &str = "x-tenant-id";

pub async fn require_actor(mut request: Request, next: Next) -> ApiResult<Response> {
    let actor = actor_from_headers(request.headers())?;

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

pub async fn enforce_operation(
    State((state, operation)): State<(AppState, &'static str)>,
    Extension(actor): Extension<ActorIdentity>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    state
        .access_service
        .require_operation(&actor, operation)
        .await?;

    Ok(next.run(request).await)
}

/// Enforces the listing operation of the `{resource}` path segment.
pub async fn enforce_scoped_operation(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(params): Path<Vec<(String, String)>>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let Some((_, resource)) = params.iter().find(|(name, _)| name == "resource") else {
        return Err(AppError::Internal("scoped route without resource segment".to_owned()).into());
    };

    state
        .access_service
        .require_operation(&actor, operations::scoped_list(resource).as_str())
        .await?;

    Ok(next.run(request).await)
}

pub fn actor_from_headers(headers: &HeaderMap) -> AppResult<ActorIdentity> {
    let principal_id = required_header(headers, PRINCIPAL_HEADER)?
        .parse::<PrincipalId>()
        .map_err(|_| AppError::Unauthorized(format!("malformed {PRINCIPAL_HEADER} header")))?;
    let tenant_id = required_header(headers, TENANT_HEADER)?
        .parse::<TenantId>()
        .map_err(|_| AppError::Unauthorized(format!("malformed {TENANT_HEADER} header")))?;

    Ok(ActorIdentity::new(principal_id, tenant_id))
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> AppResult<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Unauthorized(format!("{name} header is required")))
}
