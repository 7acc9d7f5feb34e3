use serde::{Deserialize, Serialize};

use crate::{PrincipalId, TenantId};

/// Authenticated actor handed to the access core by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
    principal_id: PrincipalId,
    tenant_id: TenantId,
}

impl ActorIdentity {
    /// Creates an actor identity from an authenticated principal and its tenant.
    #[must_use]
    pub fn new(principal_id: PrincipalId, tenant_id: TenantId) -> Self {
        Self {
            principal_id,
            tenant_id,
        }
    }

    /// Returns the authenticated principal identifier.
    #[must_use]
    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    /// Returns the tenant the session is bound to.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the stable subject string used in audit records.
    #[must_use]
    pub fn subject(&self) -> String {
        self.principal_id.to_string()
    }
}
