use super::*;

use std::collections::BTreeSet;

use crewdesk_core::AppError;
use crewdesk_domain::{Permission, Role, RoleId};

use crate::CreateRoleInput;

impl SecurityAdminService {
    /// Returns tenant roles for administrative users.
    pub async fn list_roles(&self, actor: &ActorIdentity) -> AppResult<Vec<Role>> {
        self.access_service
            .require_operation(actor, operations::ROLES_LIST)
            .await?;

        self.role_repository.list_roles(actor.tenant_id()).await
    }

    /// Creates a custom role and emits an audit event.
    pub async fn create_role(&self, actor: &ActorIdentity, input: CreateRoleInput) -> AppResult<Role> {
        self.access_service
            .require_operation(actor, operations::ROLES_CREATE)
            .await?;

        let name = input.name.trim().to_owned();
        if name.is_empty() {
            return Err(AppError::Validation("role name must not be empty".to_owned()));
        }
        let permissions = self.cataloged(input.permissions)?;

        let role = self
            .role_repository
            .create_role(actor.tenant_id(), CreateRoleInput { name, permissions })
            .await?;

        self.record_change(
            actor,
            AuditAction::SecurityRoleCreated,
            "role",
            role.id().to_string(),
            serde_json::json!({
                "name": role.name(),
                "permissions": role.permissions(),
            }),
        )
        .await?;

        Ok(role)
    }

    /// Replaces the permission set of a role and emits an audit event.
    pub async fn replace_role_permissions(
        &self,
        actor: &ActorIdentity,
        role_id: RoleId,
        permissions: Vec<Permission>,
    ) -> AppResult<Role> {
        self.access_service
            .require_operation(actor, operations::ROLES_UPDATE)
            .await?;

        let existing = self.existing_role(actor, role_id).await?;
        let permissions = self.cataloged(permissions)?;

        let role = self
            .role_repository
            .replace_role_permissions(actor.tenant_id(), role_id, permissions)
            .await?;

        self.record_change(
            actor,
            AuditAction::SecurityRolePermissionsUpdated,
            "role",
            role_id.to_string(),
            serde_json::json!({
                "name": role.name(),
                "before": existing.permissions(),
                "after": role.permissions(),
            }),
        )
        .await?;

        Ok(role)
    }

    /// Deletes a custom role that no principal is bound to.
    pub async fn delete_role(&self, actor: &ActorIdentity, role_id: RoleId) -> AppResult<()> {
        self.access_service
            .require_operation(actor, operations::ROLES_DELETE)
            .await?;

        let role = self.existing_role(actor, role_id).await?;
        if role.is_system() {
            return Err(AppError::Conflict(format!(
                "system role '{}' cannot be deleted",
                role.name()
            )));
        }

        let holders = self
            .directory_repository
            .count_principals_with_role(actor.tenant_id(), role_id)
            .await?;
        if holders > 0 {
            return Err(AppError::Conflict(format!(
                "role '{}' is still assigned to {holders} principal(s)",
                role.name()
            )));
        }

        self.role_repository
            .delete_role(actor.tenant_id(), role_id)
            .await?;

        self.record_change(
            actor,
            AuditAction::SecurityRoleDeleted,
            "role",
            role_id.to_string(),
            serde_json::json!({ "name": role.name() }),
        )
        .await
    }

    pub(super) async fn existing_role(
        &self,
        actor: &ActorIdentity,
        role_id: RoleId,
    ) -> AppResult<Role> {
        self.role_repository
            .find_role(actor.tenant_id(), role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    /// Rejects permissions the catalog does not know and collapses duplicates.
    pub(super) fn cataloged(&self, permissions: Vec<Permission>) -> AppResult<Vec<Permission>> {
        self.access_service.catalog().validate(&permissions)?;

        Ok(permissions
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }
}
