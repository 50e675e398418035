//! Login and token verification endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::HeaderMap,
    routing::{get, post},
};

use tenantgate_auth::{AuthError, TokenCodec};
use tenantgate_tenancy::{LoginResponse, VerifiedAuth};

use crate::access::RouteAccess;
use crate::app::dto::LoginRequest;
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::guards::bearer_token;
use crate::middleware::Guarded;

pub fn router(codec: Arc<dyn TokenCodec>) -> Router {
    let guard = Guarded::new(RouteAccess::inherit(), codec);
    Router::new()
        .route("/login", guard.route("POST /auth/login", RouteAccess::public(), post(login)))
        .route("/verify", guard.route("GET /auth/verify", RouteAccess::inherit(), get(verify)))
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = services.auth.login(&body.email, &body.password).await?;
    Ok(Json(response))
}

/// GET /auth/verify
pub async fn verify(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> Result<Json<VerifiedAuth>, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError(AuthError::MissingCredential.into()))?;
    let verified = services.auth.verify_auth(token).await?;
    Ok(Json(verified))
}
