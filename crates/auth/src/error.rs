//! Authentication error types.

use thiserror::Error;

use tenantgate_core::DomainError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email, inactive user, or secret mismatch. Deliberately one
    /// variant so callers cannot tell which.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing bearer credential")]
    MissingCredential,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("invalid permission code: {0}")]
    InvalidPermissionCode(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for DomainError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::MissingCredential
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_) => DomainError::unauthenticated(err.to_string()),
            AuthError::InvalidPermissionCode(_) => DomainError::bad_request(err.to_string()),
            AuthError::Crypto(_) => DomainError::internal(err.to_string()),
        }
    }
}
