use std::sync::Arc;

use crewdesk_core::{ActorIdentity, AppError, AppResult, PrincipalId};
use crewdesk_domain::{AuditAction, OrgChartNode, Principal, creates_manager_cycle};
use tracing::info;

use crate::{AccessService, AccessSnapshot, AuditEvent, AuditRepository, DirectoryRepository, operations};

/// Application service for org chart reads and reporting line changes.
#[derive(Clone)]
pub struct HierarchyService {
    access_service: AccessService,
    directory_repository: Arc<dyn DirectoryRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl HierarchyService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        access_service: AccessService,
        directory_repository: Arc<dyn DirectoryRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            access_service,
            directory_repository,
            audit_repository,
        }
    }

    /// Renders the org chart forest of the actor's tenant.
    pub async fn org_chart(&self, actor: &ActorIdentity) -> AppResult<Vec<OrgChartNode>> {
        let snapshot = self
            .access_service
            .require_operation(actor, operations::ORG_CHART_READ)
            .await?;

        Ok(snapshot.directory().forest())
    }

    /// Lists the active direct reports of a principal, ordered by display name.
    pub async fn direct_reports(
        &self,
        actor: &ActorIdentity,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<Principal>> {
        let snapshot = self
            .access_service
            .require_operation(actor, operations::PRINCIPALS_REPORTS)
            .await?;

        let directory = snapshot.directory();
        if !directory.contains(principal_id) {
            return Err(not_found(principal_id));
        }

        let mut reports = collect(&snapshot, directory.direct_reports(principal_id));
        reports.sort_by(|left, right| {
            left.display_name()
                .cmp(right.display_name())
                .then_with(|| left.id().cmp(&right.id()))
        });
        Ok(reports)
    }

    /// Lists the effective reporting chain from a principal up to its root.
    pub async fn reporting_chain(
        &self,
        actor: &ActorIdentity,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<Principal>> {
        let snapshot = self
            .access_service
            .require_operation(actor, operations::PRINCIPALS_REPORTS)
            .await?;

        let chain = snapshot.directory().ancestors(principal_id);
        if chain.is_empty() {
            return Err(not_found(principal_id));
        }

        Ok(collect(&snapshot, chain))
    }

    /// Points a principal at a new manager, or detaches it with `None`.
    ///
    /// The manager must be an active principal of the same tenant and the new
    /// edge must not close a reporting cycle.
    pub async fn reassign_manager(
        &self,
        actor: &ActorIdentity,
        principal_id: PrincipalId,
        manager_id: Option<PrincipalId>,
    ) -> AppResult<()> {
        let snapshot = self
            .access_service
            .require_operation(actor, operations::PRINCIPALS_REASSIGN_MANAGER)
            .await?;

        let Some(principal) = snapshot.principal(principal_id) else {
            return Err(not_found(principal_id));
        };
        let previous = principal.manager_id();

        if let Some(manager_id) = manager_id {
            if manager_id == principal_id {
                return Err(AppError::Validation(
                    "a principal cannot manage itself".to_owned(),
                ));
            }

            let Some(manager) = snapshot.principal(manager_id) else {
                return Err(not_found(manager_id));
            };
            if !manager.is_active() {
                return Err(AppError::Validation(format!(
                    "manager '{manager_id}' is deactivated"
                )));
            }
            if creates_manager_cycle(snapshot.principals(), principal_id, manager_id) {
                return Err(AppError::Conflict(format!(
                    "moving '{principal_id}' under '{manager_id}' would create a reporting cycle"
                )));
            }
        }

        self.directory_repository
            .update_manager(actor.tenant_id(), principal_id, manager_id)
            .await?;

        info!(
            tenant_id = %actor.tenant_id(),
            principal_id = %principal_id,
            manager_id = ?manager_id,
            "manager reassigned"
        );

        self.audit_repository
            .append_event(AuditEvent {
                tenant_id: actor.tenant_id(),
                subject: actor.subject(),
                action: AuditAction::HierarchyManagerReassigned,
                resource_type: "principal_manager".to_owned(),
                resource_id: principal_id.to_string(),
                detail: Some(
                    serde_json::json!({
                        "before": previous,
                        "after": manager_id,
                    })
                    .to_string(),
                ),
            })
            .await
    }
}

fn collect(
    snapshot: &AccessSnapshot,
    principal_ids: impl IntoIterator<Item = PrincipalId>,
) -> Vec<Principal> {
    principal_ids
        .into_iter()
        .filter_map(|principal_id| snapshot.principal(principal_id).cloned())
        .collect()
}

fn not_found(principal_id: PrincipalId) -> AppError {
    AppError::NotFound(format!("principal '{principal_id}' does not exist"))
}
