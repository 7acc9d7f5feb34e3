use crewdesk_domain::{OrgChartNode, Principal};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// API representation of a directory principal.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/principal-response.ts"
)]
pub struct PrincipalResponse {
    pub principal_id: String,
    pub display_name: String,
    pub job_title: Option<String>,
    pub manager_id: Option<String>,
    pub is_active: bool,
}

impl From<Principal> for PrincipalResponse {
    fn from(value: Principal) -> Self {
        Self {
            principal_id: value.id().to_string(),
            display_name: value.display_name().to_owned(),
            job_title: value.job_title().map(str::to_owned),
            manager_id: value.manager_id().map(|manager_id| manager_id.to_string()),
            is_active: value.is_active(),
        }
    }
}

/// One org chart node with its reports.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/org-chart-node-response.ts"
)]
pub struct OrgChartNodeResponse {
    pub principal_id: String,
    pub display_name: String,
    pub job_title: Option<String>,
    pub children: Vec<OrgChartNodeResponse>,
}

impl From<OrgChartNode> for OrgChartNodeResponse {
    fn from(value: OrgChartNode) -> Self {
        Self {
            principal_id: value.principal_id.to_string(),
            display_name: value.display_name,
            job_title: value.job_title,
            children: value.children.into_iter().map(Self::from).collect(),
        }
    }
}

/// Incoming payload for manager reassignment. `null` detaches the principal.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/reassign-manager-request.ts"
)]
pub struct ReassignManagerRequest {
    pub manager_id: Option<String>,
}
