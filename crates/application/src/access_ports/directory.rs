use async_trait::async_trait;
use crewdesk_core::{AppResult, PrincipalId, TenantId};
use crewdesk_domain::{Permission, Principal, RoleBinding, RoleId};

/// Repository port for the principal directory of a tenant.
///
/// Reads return raw rows: manager pointers may dangle or form cycles and
/// role references may be orphaned. Normalization happens in the domain.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// Lists every principal of the tenant, active or not.
    async fn list_principals(&self, tenant_id: TenantId) -> AppResult<Vec<Principal>>;

    /// Finds one principal of the tenant.
    async fn find_principal(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
    ) -> AppResult<Option<Principal>>;

    /// Replaces the raw manager pointer of a principal.
    ///
    /// The manager must be an active principal of the tenant. A pointer that
    /// would close a reporting cycle is rejected with `Conflict`, checked
    /// atomically with the write.
    async fn update_manager(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        manager_id: Option<PrincipalId>,
    ) -> AppResult<()>;

    /// Replaces the role binding of a principal.
    ///
    /// Adapters sharing storage with roles fail with `NotFound` when an
    /// assigned role no longer exists at write time.
    async fn update_role_binding(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        role_binding: RoleBinding,
    ) -> AppResult<()>;

    /// Replaces the direct permission overrides of a principal.
    async fn update_permission_overrides(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        permissions: Vec<Permission>,
    ) -> AppResult<()>;

    /// Counts principals bound to a role.
    async fn count_principals_with_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<u64>;
}
