//! Access Decision Engine: the fixed Login → Permission guard chain.
//!
//! Each guard is a plain function over a per-request `GuardContext` and can
//! short-circuit with a typed rejection. The permission guard never sees a
//! request the login guard rejected.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use tenantgate_auth::{AuthError, TokenCodec, authorize_all};
use tenantgate_core::DomainError;

use crate::access::ResolvedAccess;
use crate::context::Identity;

/// Where a request is in the guard chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardStage {
    Unchecked,
    LoginOk,
    Authorized,
}

/// Per-request state threaded through the guards.
#[derive(Debug)]
pub struct GuardContext<'a> {
    access: &'a ResolvedAccess,
    bearer: Option<&'a str>,
    identity: Option<Identity>,
    stage: GuardStage,
}

impl<'a> GuardContext<'a> {
    pub fn new(access: &'a ResolvedAccess, bearer: Option<&'a str>) -> Self {
        Self {
            access,
            bearer,
            identity: None,
            stage: GuardStage::Unchecked,
        }
    }

    pub fn stage(&self) -> GuardStage {
        self.stage
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn into_identity(self) -> Option<Identity> {
        self.identity
    }
}

/// The token from an `Authorization: Bearer <token>` header. The scheme
/// name matches case-insensitively.
///
/// Any other scheme, a non-ASCII header, or an empty token counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Stage one. Passes immediately when the route disabled the login
/// requirement; otherwise verifies the bearer token and fills the identity.
pub fn login_guard(
    ctx: &mut GuardContext<'_>,
    codec: &dyn TokenCodec,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    if !ctx.access.login_required {
        ctx.stage = GuardStage::LoginOk;
        return Ok(());
    }

    let token = ctx.bearer.ok_or(AuthError::MissingCredential)?;
    let claims = codec.verify(token, now)?;
    ctx.identity = Some(Identity::from_claims(claims));
    ctx.stage = GuardStage::LoginOk;
    Ok(())
}

/// Stage two. Requires every declared code (conjunctive).
pub fn permission_guard(ctx: &mut GuardContext<'_>) -> Result<(), DomainError> {
    if ctx.stage != GuardStage::LoginOk {
        return Err(DomainError::internal("permission guard ran before login guard"));
    }
    if ctx.access.required.is_empty() {
        ctx.stage = GuardStage::Authorized;
        return Ok(());
    }

    let identity = ctx
        .identity
        .as_ref()
        .ok_or_else(|| DomainError::unauthenticated("no identity on request"))?;
    authorize_all(&identity.permissions(), &ctx.access.required)?;
    ctx.stage = GuardStage::Authorized;
    Ok(())
}

/// Run the whole chain in its fixed order.
pub fn check_access(
    ctx: &mut GuardContext<'_>,
    codec: &dyn TokenCodec,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    login_guard(ctx, codec, now)?;
    permission_guard(ctx)
}
