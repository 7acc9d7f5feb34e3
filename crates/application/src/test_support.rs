use std::sync::Arc;

use async_trait::async_trait;
use crewdesk_core::{ActorIdentity, AppError, AppResult, PrincipalId, TenantId};
use crewdesk_domain::{
    AuditAction, LegacyRole, Permission, PermissionCatalog, Principal, Role, RoleBinding, RoleId,
};
use tokio::sync::Mutex;

use crate::{
    AccessService, AuditEvent, AuditRepository, CreateRoleInput, DirectoryRepository,
    OperationPolicy, RoleRepository,
};

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    events: Mutex<Vec<AuditEvent>>,
}

impl FakeAuditRepository {
    pub(crate) async fn actions(&self) -> Vec<AuditAction> {
        self.events
            .lock()
            .await
            .iter()
            .map(|event| event.action)
            .collect()
    }
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeDirectoryRepository {
    principals: Mutex<Vec<Principal>>,
}

impl FakeDirectoryRepository {
    pub(crate) fn new(principals: Vec<Principal>) -> Self {
        Self {
            principals: Mutex::new(principals),
        }
    }

    async fn update(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        change: impl FnOnce(Principal) -> Principal,
    ) -> AppResult<()> {
        let mut principals = self.principals.lock().await;
        let Some(index) = principals.iter().position(|principal| {
            principal.tenant_id() == tenant_id && principal.id() == principal_id
        }) else {
            return Err(AppError::NotFound(format!(
                "principal '{principal_id}' does not exist"
            )));
        };

        let updated = change(principals[index].clone());
        principals[index] = updated;
        Ok(())
    }
}

#[async_trait]
impl DirectoryRepository for FakeDirectoryRepository {
    async fn list_principals(&self, tenant_id: TenantId) -> AppResult<Vec<Principal>> {
        Ok(self
            .principals
            .lock()
            .await
            .iter()
            .filter(|principal| principal.tenant_id() == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_principal(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
    ) -> AppResult<Option<Principal>> {
        Ok(self
            .principals
            .lock()
            .await
            .iter()
            .find(|principal| principal.tenant_id() == tenant_id && principal.id() == principal_id)
            .cloned())
    }

    async fn update_manager(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        manager_id: Option<PrincipalId>,
    ) -> AppResult<()> {
        self.update(tenant_id, principal_id, |principal| {
            principal.with_manager(manager_id)
        })
        .await
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
            .lock()
            .await
            .iter()
            .filter(|principal| {
                principal.tenant_id() == tenant_id
                    && principal.role_binding().assigned_role_id() == Some(role_id)
            })
            .count();

        Ok(count as u64)
    }
}

#[derive(Default)]
pub(crate) struct FakeRoleRepository {
    roles: Mutex<Vec<Role>>,
}

impl FakeRoleRepository {
    pub(crate) fn new(roles: Vec<Role>) -> Self {
        Self {
            roles: Mutex::new(roles),
        }
    }
}

#[async_trait]
impl RoleRepository for FakeRoleRepository {
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .iter()
            .filter(|role| role.tenant_id() == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .iter()
            .find(|role| role.tenant_id() == tenant_id && role.id() == role_id)
            .cloned())
    }

    async fn create_role(&self, tenant_id: TenantId, input: CreateRoleInput) -> AppResult<Role> {
        let mut roles = self.roles.lock().await;
        if roles
            .iter()
            .any(|role| role.tenant_id() == tenant_id && role.name() == input.name)
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                input.name
            )));
        }

        let role = Role::new(RoleId::new(), tenant_id, input.name, false, input.permissions)?;
        roles.push(role.clone());
        Ok(role)
    }

    async fn replace_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permissions: Vec<Permission>,
    ) -> AppResult<Role> {
        let mut roles = self.roles.lock().await;
        let Some(index) = roles
            .iter()
            .position(|role| role.tenant_id() == tenant_id && role.id() == role_id)
        else {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        };

        let updated = roles[index].clone().with_permissions(permissions);
        roles[index] = updated.clone();
        Ok(updated)
    }

    async fn delete_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<()> {
        let mut roles = self.roles.lock().await;
        let before = roles.len();
        roles.retain(|role| !(role.tenant_id() == tenant_id && role.id() == role_id));

        if roles.len() == before {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        Ok(())
    }
}

pub(crate) fn permission(value: &str) -> Permission {
    match Permission::new(value) {
        Ok(permission) => permission,
        Err(error) => panic!("invalid test permission: {error}"),
    }
}

pub(crate) fn principal(
    tenant_id: TenantId,
    name: &str,
    manager_id: Option<PrincipalId>,
    role_binding: RoleBinding,
) -> Principal {
    match Principal::new(PrincipalId::new(), tenant_id, name) {
        Ok(value) => value
            .with_manager(manager_id)
            .with_role_binding(role_binding),
        Err(error) => panic!("invalid test principal: {error}"),
    }
}

pub(crate) fn employee(tenant_id: TenantId, name: &str, manager_id: Option<PrincipalId>) -> Principal {
    principal(
        tenant_id,
        name,
        manager_id,
        RoleBinding::Legacy(LegacyRole::Employee),
    )
}

pub(crate) fn role(tenant_id: TenantId, name: &str, is_system: bool, permissions: &[&str]) -> Role {
    match Role::new(
        RoleId::new(),
        tenant_id,
        name,
        is_system,
        permissions.iter().map(|value| permission(value)),
    ) {
        Ok(value) => value,
        Err(error) => panic!("invalid test role: {error}"),
    }
}

pub(crate) fn actor(principal: &Principal) -> ActorIdentity {
    ActorIdentity::new(principal.id(), principal.tenant_id())
}

pub(crate) struct Fixture {
    pub(crate) access: AccessService,
    pub(crate) directory: Arc<FakeDirectoryRepository>,
    pub(crate) roles: Arc<FakeRoleRepository>,
    pub(crate) audit: Arc<FakeAuditRepository>,
}

pub(crate) fn fixture(principals: Vec<Principal>, roles: Vec<Role>) -> Fixture {
    let directory = Arc::new(FakeDirectoryRepository::new(principals));
    let role_repository = Arc::new(FakeRoleRepository::new(roles));
    let audit = Arc::new(FakeAuditRepository::default());
    let policy = match OperationPolicy::builtin() {
        Ok(policy) => policy,
        Err(error) => panic!("builtin policy should build: {error}"),
    };

    let access = match AccessService::new(
        Arc::new(PermissionCatalog::builtin()),
        Arc::new(policy),
        directory.clone(),
        role_repository.clone(),
        audit.clone(),
    ) {
        Ok(service) => service,
        Err(error) => panic!("access service should build: {error}"),
    };

    Fixture {
        access,
        directory,
        roles: role_repository,
        audit,
    }
}
