use std::collections::HashMap;

use async_trait::async_trait;
use crewdesk_application::{CreateRoleInput, RoleRepository};
use crewdesk_core::{AppError, AppResult, TenantId};
use crewdesk_domain::{Permission, Role, RoleId};
use tokio::sync::RwLock;

/// In-memory role definitions.
#[derive(Debug, Default)]
pub struct InMemoryRoleRepository {
    roles: RwLock<HashMap<RoleId, Role>>,
}

impl InMemoryRoleRepository {
    /// Creates an empty in-memory role store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a prepared role, system roles included.
    pub async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        ensure_unique_name(&roles, role.tenant_id(), role.name())?;

        roles.insert(role.id(), role);
        Ok(())
    }
}

fn ensure_unique_name(
    roles: &HashMap<RoleId, Role>,
    tenant_id: TenantId,
    name: &str,
) -> AppResult<()> {
    if roles
        .values()
        .any(|role| role.tenant_id() == tenant_id && role.name() == name)
    {
        return Err(AppError::Conflict(format!("role '{name}' already exists")));
    }

    Ok(())
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>> {
        let mut values: Vec<Role> = self
            .roles
            .read()
            .await
            .values()
            .filter(|role| role.tenant_id() == tenant_id)
            .cloned()
            .collect();
        values.sort_by(|left, right| left.name().cmp(right.name()));

        Ok(values)
    }

    async fn find_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .get(&role_id)
            .filter(|role| role.tenant_id() == tenant_id)
            .cloned())
    }

    async fn create_role(&self, tenant_id: TenantId, input: CreateRoleInput) -> AppResult<Role> {
        let role = Role::new(
            RoleId::new(),
            tenant_id,
            input.name.trim(),
            false,
            input.permissions,
        )?;

        self.insert_role(role.clone()).await?;
        Ok(role)
    }

    async fn replace_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permissions: Vec<Permission>,
    ) -> AppResult<Role> {
        let mut roles = self.roles.write().await;
        let Some(current) = roles
            .get(&role_id)
            .filter(|role| role.tenant_id() == tenant_id)
            .cloned()
        else {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        };

        let updated = current.with_permissions(permissions);
        roles.insert(role_id, updated.clone());
        Ok(updated)
    }

    async fn delete_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        if !roles
            .get(&role_id)
            .is_some_and(|role| role.tenant_id() == tenant_id)
        {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        roles.remove(&role_id);
        Ok(())
    }
}
