use std::sync::Arc;

use crewdesk_core::{ActorIdentity, AppError, AppResult, PrincipalId, TenantId};
use crewdesk_domain::{
    AccessDecision, AuditAction, AuthorizationGate, DenyReason, EffectivePermissions,
    HierarchyDirectory, Permission, PermissionCatalog, PermissionRequirement, Principal, Role,
    RoleStore,
};
use tracing::warn;

use crate::{AuditEvent, AuditRepository, DirectoryRepository, OperationPolicy, RoleRepository};

mod scope;

/// Tenant snapshot loaded for one authorization request.
#[derive(Debug, Clone)]
pub struct AccessSnapshot {
    actor: Principal,
    principals: Vec<Principal>,
    roles: Vec<Role>,
}

impl AccessSnapshot {
    /// Returns the acting principal.
    #[must_use]
    pub fn actor(&self) -> &Principal {
        &self.actor
    }

    /// Returns every principal of the actor's tenant, raw.
    #[must_use]
    pub fn principals(&self) -> &[Principal] {
        self.principals.as_slice()
    }

    /// Returns every role of the actor's tenant.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        self.roles.as_slice()
    }

    /// Returns a principal of the tenant by id.
    #[must_use]
    pub fn principal(&self, principal_id: PrincipalId) -> Option<&Principal> {
        self.principals
            .iter()
            .find(|principal| principal.id() == principal_id)
    }

    /// Builds the normalized hierarchy of the actor's tenant.
    #[must_use]
    pub fn directory(&self) -> HierarchyDirectory {
        HierarchyDirectory::new(self.actor.tenant_id(), &self.principals)
    }

    /// Resolves the actor's effective permissions.
    #[must_use]
    pub fn effective_permissions(&self, catalog: &PermissionCatalog) -> EffectivePermissions {
        RoleStore::new(catalog, &self.roles).effective_permissions(&self.actor)
    }
}

/// Application service enforcing permission and tenant checks.
#[derive(Clone)]
pub struct AccessService {
    catalog: Arc<PermissionCatalog>,
    policy: Arc<OperationPolicy>,
    directory_repository: Arc<dyn DirectoryRepository>,
    role_repository: Arc<dyn RoleRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl AccessService {
    /// Creates the service and validates the policy table against the catalog.
    pub fn new(
        catalog: Arc<PermissionCatalog>,
        policy: Arc<OperationPolicy>,
        directory_repository: Arc<dyn DirectoryRepository>,
        role_repository: Arc<dyn RoleRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> AppResult<Self> {
        policy.validate(&catalog)?;

        Ok(Self {
            catalog,
            policy,
            directory_repository,
            role_repository,
            audit_repository,
        })
    }

    /// Returns the permission catalog.
    #[must_use]
    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    /// Returns the operation policy table.
    #[must_use]
    pub fn policy(&self) -> &OperationPolicy {
        &self.policy
    }

    /// Loads the actor's tenant snapshot.
    ///
    /// An actor absent from its session tenant is treated as unauthenticated.
    pub async fn snapshot(&self, actor: &ActorIdentity) -> AppResult<AccessSnapshot> {
        let tenant_id = actor.tenant_id();
        let principals = self.directory_repository.list_principals(tenant_id).await?;
        let roles = self.role_repository.list_roles(tenant_id).await?;

        let principal = principals
            .iter()
            .find(|principal| {
                principal.id() == actor.principal_id() && principal.tenant_id() == tenant_id
            })
            .cloned()
            .ok_or_else(|| {
                AppError::Unauthorized(format!(
                    "principal '{}' is not known in tenant '{tenant_id}'",
                    actor.principal_id()
                ))
            })?;

        Ok(AccessSnapshot {
            actor: principal,
            principals,
            roles,
        })
    }

    /// Returns the actor's effective permissions, wildcard expanded.
    pub async fn effective_permissions(&self, actor: &ActorIdentity) -> AppResult<Vec<Permission>> {
        let snapshot = self.snapshot(actor).await?;
        Ok(snapshot
            .effective_permissions(&self.catalog)
            .to_list(&self.catalog))
    }

    /// Returns the decision for a requirement without failing on denial.
    ///
    /// Denials are still audited.
    pub async fn authorize(
        &self,
        actor: &ActorIdentity,
        requirement: &PermissionRequirement,
        resource_tenant: Option<TenantId>,
    ) -> AppResult<AccessDecision> {
        let snapshot = self.snapshot(actor).await?;
        let decision = self.decide(&snapshot, requirement, resource_tenant);

        if let AccessDecision::Deny(reason) = &decision {
            self.record_denial(&snapshot, reason, requirement.to_string().as_str())
                .await?;
        }

        Ok(decision)
    }

    /// Ensures the actor satisfies a requirement inside its own tenant.
    pub async fn require(
        &self,
        actor: &ActorIdentity,
        requirement: &PermissionRequirement,
    ) -> AppResult<AccessSnapshot> {
        let snapshot = self.snapshot(actor).await?;
        self.enforce(&snapshot, requirement, None).await?;
        Ok(snapshot)
    }

    /// Ensures the actor satisfies a requirement and may reach `resource_tenant`.
    pub async fn require_in_tenant(
        &self,
        actor: &ActorIdentity,
        requirement: &PermissionRequirement,
        resource_tenant: TenantId,
    ) -> AppResult<AccessSnapshot> {
        let snapshot = self.snapshot(actor).await?;
        self.enforce(&snapshot, requirement, Some(resource_tenant))
            .await?;
        Ok(snapshot)
    }

    /// Ensures the actor satisfies the declared requirement of an operation.
    pub async fn require_operation(
        &self,
        actor: &ActorIdentity,
        operation: &str,
    ) -> AppResult<AccessSnapshot> {
        let requirement = self.policy.requirement(operation)?.clone();
        self.require(actor, &requirement).await
    }

    /// Checks a requirement against an already loaded snapshot.
    pub async fn enforce(
        &self,
        snapshot: &AccessSnapshot,
        requirement: &PermissionRequirement,
        resource_tenant: Option<TenantId>,
    ) -> AppResult<()> {
        match self.decide(snapshot, requirement, resource_tenant) {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(reason) => {
                self.record_denial(snapshot, &reason, requirement.to_string().as_str())
                    .await?;
                Err(denial_error(&reason))
            }
        }
    }

    fn decide(
        &self,
        snapshot: &AccessSnapshot,
        requirement: &PermissionRequirement,
        resource_tenant: Option<TenantId>,
    ) -> AccessDecision {
        let effective = snapshot.effective_permissions(&self.catalog);
        AuthorizationGate::authorize_in_tenant(
            snapshot.actor(),
            &effective,
            requirement,
            resource_tenant.unwrap_or(snapshot.actor().tenant_id()),
        )
    }

    async fn record_denial(
        &self,
        snapshot: &AccessSnapshot,
        reason: &DenyReason,
        requested: &str,
    ) -> AppResult<()> {
        let actor = snapshot.actor();
        warn!(
            principal_id = %actor.id(),
            tenant_id = %actor.tenant_id(),
            reason = reason.code(),
            requested,
            "access denied"
        );

        self.audit_repository
            .append_event(AuditEvent {
                tenant_id: actor.tenant_id(),
                subject: actor.id().to_string(),
                action: AuditAction::for_denial(reason),
                resource_type: "access_check".to_owned(),
                resource_id: requested.to_owned(),
                detail: Some(denial_detail(reason)),
            })
            .await
    }
}

fn denial_detail(reason: &DenyReason) -> String {
    match reason {
        DenyReason::MissingPermission { required } => format!(
            "missing any of [{}]",
            required
                .iter()
                .map(Permission::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        DenyReason::TenantViolation {
            actor_tenant,
            resource_tenant,
        } => format!("actor tenant '{actor_tenant}' requested tenant '{resource_tenant}'"),
        DenyReason::InactivePrincipal => "principal is deactivated".to_owned(),
    }
}

fn denial_error(reason: &DenyReason) -> AppError {
    AppError::Forbidden(format!("{}: {}", reason.code(), denial_detail(reason)))
}
