use super::*;

use crewdesk_core::{AppError, PrincipalId};
use crewdesk_domain::{Permission, Principal, RoleBinding};

impl SecurityAdminService {
    /// Changes how a principal obtains role permissions.
    ///
    /// Only a platform super-admin may grant or revoke the super-admin binding.
    pub async fn assign_role_binding(
        &self,
        actor: &ActorIdentity,
        principal_id: PrincipalId,
        role_binding: RoleBinding,
    ) -> AppResult<()> {
        let snapshot = self
            .access_service
            .require_operation(actor, operations::PRINCIPALS_ASSIGN_ROLE)
            .await?;

        let target = self.existing_principal(actor, principal_id).await?;
        let touches_super_admin =
            target.is_super_admin() || matches!(role_binding, RoleBinding::SuperAdmin);
        if touches_super_admin && !snapshot.actor().is_super_admin() {
            return Err(AppError::Forbidden(
                "only a platform super-admin can change a super-admin binding".to_owned(),
            ));
        }
        if let Some(role_id) = role_binding.assigned_role_id() {
            self.existing_role(actor, role_id).await?;
        }

        self.directory_repository
            .update_role_binding(actor.tenant_id(), principal_id, role_binding)
            .await?;

        self.record_change(
            actor,
            AuditAction::SecurityRoleAssigned,
            "principal_role_binding",
            principal_id.to_string(),
            serde_json::json!({
                "before": target.role_binding(),
                "after": role_binding,
            }),
        )
        .await
    }

    /// Replaces the direct permission overrides of a principal.
    pub async fn set_permission_overrides(
        &self,
        actor: &ActorIdentity,
        principal_id: PrincipalId,
        permissions: Vec<Permission>,
    ) -> AppResult<Vec<Permission>> {
        self.access_service
            .require_operation(actor, operations::PRINCIPALS_SET_OVERRIDES)
            .await?;

        let target = self.existing_principal(actor, principal_id).await?;
        let permissions = self.cataloged(permissions)?;

        self.directory_repository
            .update_permission_overrides(actor.tenant_id(), principal_id, permissions.clone())
            .await?;

        self.record_change(
            actor,
            AuditAction::SecurityOverridesUpdated,
            "principal_overrides",
            principal_id.to_string(),
            serde_json::json!({
                "before": target.permission_overrides(),
                "after": permissions,
            }),
        )
        .await?;

        Ok(permissions)
    }

    async fn existing_principal(
        &self,
        actor: &ActorIdentity,
        principal_id: PrincipalId,
    ) -> AppResult<Principal> {
        self.directory_repository
            .find_principal(actor.tenant_id(), principal_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("principal '{principal_id}' does not exist"))
            })
    }
}
