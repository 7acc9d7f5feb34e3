use super::*;

use crewdesk_domain::{SCOPED_RESOURCES, ScopeFilter, ScopeResolver, ScopeTier};

impl AccessService {
    /// Authorizes `tier` on `resource` and resolves it to a record filter.
    pub async fn resolve_scope(
        &self,
        actor: &ActorIdentity,
        resource: &str,
        tier: ScopeTier,
    ) -> AppResult<ScopeFilter> {
        ensure_scoped_resource(resource)?;

        let snapshot = self.snapshot(actor).await?;
        self.enforce(&snapshot, &tier.requirement(resource)?, None)
            .await?;

        let directory = snapshot.directory();
        Ok(ScopeResolver::new(&directory).resolve(snapshot.actor(), tier))
    }

    /// Resolves the broadest tier the actor holds on `resource`.
    ///
    /// Fails with the own-tier denial when no tier is held.
    pub async fn resolve_widest_scope(
        &self,
        actor: &ActorIdentity,
        resource: &str,
    ) -> AppResult<(ScopeTier, ScopeFilter)> {
        ensure_scoped_resource(resource)?;

        let snapshot = self.snapshot(actor).await?;
        let tier = match self.widest_tier(&snapshot, resource)? {
            Some(tier) => tier,
            None => {
                self.enforce(&snapshot, &ScopeTier::Own.requirement(resource)?, None)
                    .await?;
                ScopeTier::Own
            }
        };

        let directory = snapshot.directory();
        Ok((
            tier,
            ScopeResolver::new(&directory).resolve(snapshot.actor(), tier),
        ))
    }

    /// Checks that the actor may read one record of `resource`.
    ///
    /// Tenant isolation is checked first. The owner must then fall inside the
    /// actor's widest tier; otherwise the narrowest tier reaching the owner is
    /// reported as missing.
    pub async fn authorize_record(
        &self,
        actor: &ActorIdentity,
        resource: &str,
        record_tenant: TenantId,
        owner: PrincipalId,
    ) -> AppResult<()> {
        ensure_scoped_resource(resource)?;

        let snapshot = self.snapshot(actor).await?;
        let requested = format!("{resource}:{owner}");

        if let AccessDecision::Deny(reason) =
            AuthorizationGate::authorize_tenant(snapshot.actor(), record_tenant)
        {
            self.record_denial(&snapshot, &reason, requested.as_str())
                .await?;
            return Err(denial_error(&reason));
        }
        if snapshot.actor().is_super_admin() && snapshot.actor().is_active() {
            return Ok(());
        }

        let directory = snapshot.directory();
        if let Some(tier) = self.widest_tier(&snapshot, resource)?
            && ScopeResolver::new(&directory)
                .resolve(snapshot.actor(), tier)
                .permits(record_tenant, owner)
        {
            return Ok(());
        }

        let needed = if owner == snapshot.actor().id() {
            ScopeTier::Own
        } else if directory.is_descendant(owner, snapshot.actor().id()) {
            ScopeTier::Team
        } else {
            ScopeTier::All
        };
        self.enforce(&snapshot, &needed.requirement(resource)?, Some(record_tenant))
            .await
    }

    fn widest_tier(
        &self,
        snapshot: &AccessSnapshot,
        resource: &str,
    ) -> AppResult<Option<ScopeTier>> {
        let effective = snapshot.effective_permissions(&self.catalog);

        for tier in ScopeTier::ALL_TIERS.iter().rev() {
            let requirement = tier.requirement(resource)?;
            if AuthorizationGate::authorize(snapshot.actor(), &effective, &requirement).is_allowed()
            {
                return Ok(Some(*tier));
            }
        }

        Ok(None)
    }
}

fn ensure_scoped_resource(resource: &str) -> AppResult<()> {
    if SCOPED_RESOURCES.iter().any(|scoped| *scoped == resource) {
        return Ok(());
    }

    Err(AppError::Validation(format!(
        "resource '{resource}' does not support scoped access"
    )))
}
