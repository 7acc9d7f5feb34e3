use std::sync::Arc;

use crewdesk_core::{ActorIdentity, AppResult};
use crewdesk_domain::{AuditAction, PermissionResource};
use tracing::info;

use crate::{
    AccessService, AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
    DirectoryRepository, RoleRepository, operations,
};

mod principals;
mod roles;

/// Application service for role, binding and override administration.
#[derive(Clone)]
pub struct SecurityAdminService {
    access_service: AccessService,
    directory_repository: Arc<dyn DirectoryRepository>,
    role_repository: Arc<dyn RoleRepository>,
    audit_log_repository: Arc<dyn AuditLogRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl SecurityAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        access_service: AccessService,
        directory_repository: Arc<dyn DirectoryRepository>,
        role_repository: Arc<dyn RoleRepository>,
        audit_log_repository: Arc<dyn AuditLogRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            access_service,
            directory_repository,
            role_repository,
            audit_log_repository,
            audit_repository,
        }
    }

    /// Returns the permission catalog grouped by resource.
    pub async fn permission_catalog(
        &self,
        actor: &ActorIdentity,
    ) -> AppResult<Vec<PermissionResource>> {
        self.access_service
            .require_operation(actor, operations::PERMISSIONS_CATALOG)
            .await?;

        Ok(self.access_service.catalog().resources())
    }

    /// Returns recent audit entries of the actor's tenant.
    pub async fn list_audit_log(
        &self,
        actor: &ActorIdentity,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        self.access_service
            .require_operation(actor, operations::AUDIT_LIST)
            .await?;

        self.audit_log_repository
            .list_recent_entries(actor.tenant_id(), query)
            .await
    }

    async fn record_change(
        &self,
        actor: &ActorIdentity,
        action: AuditAction,
        resource_type: &str,
        resource_id: String,
        detail: serde_json::Value,
    ) -> AppResult<()> {
        info!(
            tenant_id = %actor.tenant_id(),
            subject = %actor.principal_id(),
            action = action.as_str(),
            resource_id = resource_id.as_str(),
            "security change recorded"
        );

        self.audit_repository
            .append_event(AuditEvent {
                tenant_id: actor.tenant_id(),
                subject: actor.subject(),
                action,
                resource_type: resource_type.to_owned(),
                resource_id,
                detail: Some(detail.to_string()),
            })
            .await
    }
}
