use std::collections::BTreeSet;

use tenantgate_auth::{Claims, RoleClaim, flatten_permissions};
use tenantgate_core::{TenantId, UserId};

/// Identity context for a request, populated by the login guard from the
/// token claims.
///
/// Immutable once inserted into the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    id: UserId,
    email: String,
    name: String,
    tenant_id: Option<TenantId>,
    roles: Vec<RoleClaim>,
}

impl Identity {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            id: claims.id,
            email: claims.email,
            name: claims.name,
            tenant_id: claims.tenant_id,
            roles: claims.roles,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn roles(&self) -> &[RoleClaim] {
        &self.roles
    }

    /// Every permission code carried by the identity's roles.
    pub fn permissions(&self) -> BTreeSet<String> {
        flatten_permissions(&self.roles)
    }
}
