//! Credential issuer: verified identity in, signed token out.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use tenantgate_core::{RoleWithPermissions, User};

use crate::claims::Claims;
use crate::error::AuthError;
use crate::token::TokenCodec;

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

#[derive(Clone)]
pub struct CredentialIssuer {
    codec: Arc<dyn TokenCodec>,
}

impl CredentialIssuer {
    pub fn new(codec: Arc<dyn TokenCodec>) -> Self {
        Self { codec }
    }

    /// Mint a 7-day token for `user` with `roles` (permissions already loaded).
    pub fn issue(
        &self,
        user: &User,
        roles: &[RoleWithPermissions],
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let claims = Claims::for_user(user, roles, now);
        let token = self.codec.sign(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    pub fn codec(&self) -> &Arc<dyn TokenCodec> {
        &self.codec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Hs256TokenCodec;
    use tenantgate_core::{Permission, PermissionId, PermissionType, Role, RoleId, Status, TenantId, UserId};

    #[test]
    fn issued_token_carries_role_permissions() {
        let issuer = CredentialIssuer::new(Arc::new(Hs256TokenCodec::new("k")));
        let tenant_id = TenantId::new();
        let role = RoleWithPermissions {
            role: Role {
                id: RoleId::new(),
                name: "member".to_string(),
                tenant_id: Some(tenant_id),
                permission_ids: vec![],
            },
            permissions: vec![Permission {
                id: PermissionId::new(),
                code: "app:einvoice:access".to_string(),
                kind: PermissionType::App,
                resource: "einvoice".to_string(),
                action: "access".to_string(),
            }],
        };
        let user = User {
            id: UserId::new(),
            email: "lin@example.com".to_string(),
            name: "Lin".to_string(),
            tenant_id: Some(tenant_id),
            role_ids: vec![role.role.id],
            status: Status::Active,
            password_hash: String::new(),
        };

        let now = Utc::now();
        let issued = issuer.issue(&user, std::slice::from_ref(&role), now).unwrap();
        let decoded = issuer.codec().verify(&issued.token, now).unwrap();

        assert_eq!(decoded.tenant_id, Some(tenant_id));
        assert_eq!(decoded.roles[0].permissions, vec!["app:einvoice:access".to_string()]);
    }
}
