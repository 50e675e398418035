//! Token signing and verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::{Claims, TokenValidationError, validate_claims};
use crate::error::AuthError;

/// Signs claims into a bearer token and verifies tokens back into claims.
///
/// Verification is synchronous and CPU-bound; implementations must not block
/// on IO.
pub trait TokenCodec: Send + Sync {
    fn sign(&self, claims: &Claims) -> Result<String, AuthError>;

    /// Check signature and time window at `now`.
    ///
    /// Expired tokens fail with `AuthError::TokenExpired`; anything else that
    /// is wrong with the token fails with `AuthError::TokenInvalid`.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError>;
}

/// HMAC-SHA256 signed JWTs with a shared secret.
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        let mut validation = Validation::new(Algorithm::HS256);
        // The time window is checked by `validate_claims` against the caller's
        // clock so expiry is deterministic under test.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl core::fmt::Debug for Hs256TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec for Hs256TokenCodec {
    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })?;

        validate_claims(&claims, now).map_err(|e| match e {
            TokenValidationError::Expired => AuthError::TokenExpired,
            other => AuthError::TokenInvalid(other.to_string()),
        })?;

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::RoleClaim;
    use chrono::Duration;
    use tenantgate_core::{RoleId, TenantId, UserId};

    fn claims_at(issued_at: DateTime<Utc>) -> Claims {
        Claims {
            id: UserId::new(),
            email: "grace@example.com".to_string(),
            name: "Grace".to_string(),
            tenant_id: Some(TenantId::new()),
            roles: vec![RoleClaim {
                id: RoleId::new(),
                name: "member".to_string(),
                permissions: vec!["app:crm:access".to_string()],
            }],
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::days(7)).timestamp(),
        }
    }

    #[test]
    fn sign_then_verify_returns_claims() {
        let codec = Hs256TokenCodec::new("secret");
        let now = Utc::now();
        let claims = claims_at(now);

        let token = codec.sign(&claims).unwrap();
        assert_eq!(codec.verify(&token, now).unwrap(), claims);
    }

    #[test]
    fn expired_and_malformed_are_distinguishable() {
        let codec = Hs256TokenCodec::new("secret");
        let issued = Utc::now() - Duration::days(8);
        let token = codec.sign(&claims_at(issued)).unwrap();

        let expired = codec.verify(&token, Utc::now()).unwrap_err();
        assert_eq!(expired, AuthError::TokenExpired);
        assert!(expired.to_string().contains("expired"));

        let garbage = codec.verify("not.a.jwt", Utc::now()).unwrap_err();
        assert!(matches!(garbage, AuthError::TokenInvalid(_)));
        assert!(garbage.to_string().contains("invalid"));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let now = Utc::now();
        let token = Hs256TokenCodec::new("one").sign(&claims_at(now)).unwrap();
        let err = Hs256TokenCodec::new("two").verify(&token, now).unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(_)));
    }
}
