use std::collections::HashMap;

use async_trait::async_trait;
use crewdesk_application::DirectoryRepository;
use crewdesk_core::{AppError, AppResult, PrincipalId, TenantId};
use crewdesk_domain::{Permission, Principal, RoleBinding, RoleId, creates_manager_cycle};
use tokio::sync::RwLock;

/// In-memory principal directory.
#[derive(Debug, Default)]
pub struct InMemoryDirectoryRepository {
    principals: RwLock<HashMap<PrincipalId, Principal>>,
}

impl InMemoryDirectoryRepository {
    /// Creates an empty in-memory directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a principal. Ids are unique across tenants.
    pub async fn insert_principal(&self, principal: Principal) -> AppResult<()> {
        let mut principals = self.principals.write().await;

        if principals.contains_key(&principal.id()) {
            return Err(AppError::Conflict(format!(
                "principal '{}' already exists",
                principal.id()
            )));
        }

        principals.insert(principal.id(), principal);
        Ok(())
    }

    async fn update(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        change: impl FnOnce(Principal) -> Principal + Send,
    ) -> AppResult<()> {
        let mut principals = self.principals.write().await;

        let Some(current) = principals
            .get(&principal_id)
            .filter(|principal| principal.tenant_id() == tenant_id)
            .cloned()
        else {
            return Err(AppError::NotFound(format!(
                "principal '{principal_id}' does not exist in tenant '{tenant_id}'"
            )));
        };

        principals.insert(principal_id, change(current));
        Ok(())
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryDirectoryRepository {
    async fn list_principals(&self, tenant_id: TenantId) -> AppResult<Vec<Principal>> {
        let principals = self.principals.read().await;

        let mut values: Vec<Principal> = principals
            .values()
            .filter(|principal| principal.tenant_id() == tenant_id)
            .cloned()
            .collect();
        values.sort_by(|left, right| {
            left.display_name()
                .cmp(right.display_name())
                .then_with(|| left.id().cmp(&right.id()))
        });

        Ok(values)
    }

    async fn find_principal(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
    ) -> AppResult<Option<Principal>> {
        Ok(self
            .principals
            .read()
            .await
            .get(&principal_id)
            .filter(|principal| principal.tenant_id() == tenant_id)
            .cloned())
    }

    async fn update_manager(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        manager_id: Option<PrincipalId>,
    ) -> AppResult<()> {
        let mut principals = self.principals.write().await;

        let tenant: Vec<Principal> = principals
            .values()
            .filter(|principal| principal.tenant_id() == tenant_id)
            .cloned()
            .collect();
        let Some(current) = tenant
            .iter()
            .find(|principal| principal.id() == principal_id)
            .cloned()
        else {
            return Err(AppError::NotFound(format!(
                "principal '{principal_id}' does not exist in tenant '{tenant_id}'"
            )));
        };

        if let Some(manager_id) = manager_id {
            match tenant.iter().find(|principal| principal.id() == manager_id) {
                None => {
                    return Err(AppError::NotFound(format!(
                        "principal '{manager_id}' does not exist in tenant '{tenant_id}'"
                    )));
                }
                Some(manager) if !manager.is_active() => {
                    return Err(AppError::Validation(format!(
                        "manager '{manager_id}' is deactivated"
                    )));
                }
                Some(_) => {}
            }
            if creates_manager_cycle(&tenant, principal_id, manager_id) {
                return Err(AppError::Conflict(format!(
                    "moving '{principal_id}' under '{manager_id}' would create a reporting cycle"
                )));
            }
        }

        principals.insert(principal_id, current.with_manager(manager_id));
        Ok(())
    }

    async fn update_role_binding(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        role_binding: RoleBinding,
    ) -> AppResult<()> {
        self.update(tenant_id, principal_id, |principal| {
            principal.with_role_binding(role_binding)
        })
        .await
    }

    async fn update_permission_overrides(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        permissions: Vec<Permission>,
    ) -> AppResult<()> {
        self.update(tenant_id, principal_id, |principal| {
            principal.with_permission_overrides(permissions)
        })
        .await
    }

    async fn count_principals_with_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<u64> {
        let count = self
            .principals
            .read()
            .await
            .values()
            .filter(|principal| {
                principal.tenant_id() == tenant_id
                    && principal.role_binding().assigned_role_id() == Some(role_id)
            })
            .count();

        Ok(count as u64)
    }
}
