use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tenantgate_core::{RoleId, RoleWithPermissions, TenantId, User, UserId};

/// Fixed validity of every issued token. There is no refresh flow.
pub const TOKEN_TTL_DAYS: i64 = 7;

pub fn token_ttl() -> Duration {
    Duration::days(TOKEN_TTL_DAYS)
}

/// Decoded token payload.
///
/// A point-in-time snapshot of the user's roles and their permission codes:
/// changes to role records only reach a client on its next login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub tenant_id: Option<TenantId>,
    pub roles: Vec<RoleClaim>,

    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiration (Unix seconds).
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaim {
    pub id: RoleId,
    pub name: String,
    pub permissions: Vec<String>,
}

impl RoleClaim {
    pub fn from_role(role: &RoleWithPermissions) -> Self {
        Self {
            id: role.role.id,
            name: role.role.name.clone(),
            permissions: role.permissions.iter().map(|p| p.code.clone()).collect(),
        }
    }
}

impl Claims {
    pub fn for_user(user: &User, roles: &[RoleWithPermissions], issued_at: DateTime<Utc>) -> Self {
        let expires_at = issued_at + token_ttl();
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            tenant_id: user.tenant_id,
            roles: roles.iter().map(RoleClaim::from_role).collect(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the claims' time window against `now`.
///
/// Signature verification happens in the codec; this only looks at `iat`/`exp`.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
