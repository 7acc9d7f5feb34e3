use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use crewdesk_core::{ActorIdentity, PrincipalId};

use crate::dto::{OrgChartNodeResponse, PrincipalResponse, ReassignManagerRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn org_chart_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<Vec<OrgChartNodeResponse>>> {
    let forest = state
        .hierarchy_service
        .org_chart(&actor)
        .await?
        .into_iter()
        .map(OrgChartNodeResponse::from)
        .collect();

    Ok(Json(forest))
}

pub async fn direct_reports_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(principal_id): Path<String>,
) -> ApiResult<Json<Vec<PrincipalResponse>>> {
    let principal_id = PrincipalId::from_str(principal_id.as_str())?;
    let reports = state
        .hierarchy_service
        .direct_reports(&actor, principal_id)
        .await?
        .into_iter()
        .map(PrincipalResponse::from)
        .collect();

    Ok(Json(reports))
}

pub async fn reporting_chain_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(principal_id): Path<String>,
) -> ApiResult<Json<Vec<PrincipalResponse>>> {
    let principal_id = PrincipalId::from_str(principal_id.as_str())?;
    let chain = state
        .hierarchy_service
        .reporting_chain(&actor, principal_id)
        .await?
        .into_iter()
        .map(PrincipalResponse::from)
        .collect();

    Ok(Json(chain))
}

pub async fn reassign_manager_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(principal_id): Path<String>,
    Json(payload): Json<ReassignManagerRequest>,
) -> ApiResult<StatusCode> {
    let principal_id = PrincipalId::from_str(principal_id.as_str())?;
    let manager_id = payload
        .manager_id
        .as_deref()
        .map(PrincipalId::from_str)
        .transpose()?;

    state
        .hierarchy_service
        .reassign_manager(&actor, principal_id, manager_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
