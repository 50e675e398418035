//! `tenantgate-auth`: credentials and permission checks.
//!
//! This crate is intentionally decoupled from HTTP and storage: it issues and
//! verifies tokens, compares secrets, and decides whether a set of granted
//! permission codes satisfies a route's requirements.

pub mod authorize;
pub mod catalog;
pub mod claims;
pub mod error;
pub mod issuer;
pub mod password;
pub mod permissions;
pub mod token;

pub use authorize::{AuthzError, authorize_all, flatten_permissions};
pub use claims::{Claims, RoleClaim, TOKEN_TTL_DAYS, TokenValidationError, token_ttl, validate_claims};
pub use error::AuthError;
pub use issuer::{CredentialIssuer, IssuedToken};
pub use password::{BcryptComparator, SecretComparator};
pub use permissions::{PermissionCode, app_access_codes};
pub use token::{Hs256TokenCodec, TokenCodec};
