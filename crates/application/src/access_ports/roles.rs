use async_trait::async_trait;
use crewdesk_core::{AppResult, TenantId};
use crewdesk_domain::{Permission, Role, RoleId};

/// Input payload for creating custom roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name in tenant scope.
    pub name: String,
    /// Grants to attach to the role.
    pub permissions: Vec<Permission>,
}

/// Repository port for tenant role definitions.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Lists all tenant roles, ordered by name.
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>>;

    /// Finds one tenant role.
    async fn find_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Creates a non-system role. Names are unique per tenant.
    async fn create_role(&self, tenant_id: TenantId, input: CreateRoleInput) -> AppResult<Role>;

    /// Replaces the permission set of a role.
    async fn replace_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permissions: Vec<Permission>,
    ) -> AppResult<Role>;

    /// Deletes a role definition.
    ///
    /// Adapters sharing storage with principals fail with `Conflict` while a
    /// principal is still bound to the role.
    async fn delete_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<()>;
}
