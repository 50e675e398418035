//! Tenant listing, reachable applications, and per-application settings.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::get,
};
use serde_json::Value;

use tenantgate_auth::TokenCodec;
use tenantgate_auth::catalog::system;
use tenantgate_core::{SubApplication, Tenant, TenantId, UserId};
use tenantgate_tenancy::{ConfigMode, TenantAppConfig, require_app_code};

use crate::access::RouteAccess;
use crate::app::dto::{ConfigQuery, ModeQuery};
use crate::app::errors::ApiError;
use crate::app::extract::{ApiJson, ApiQuery};
use crate::app::services::AppServices;
use crate::context::Identity;
use crate::middleware::Guarded;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router(codec: Arc<dyn TokenCodec>) -> Router {
    // Controller default: login required, no permissions.
    let guard = Guarded::new(RouteAccess::login(), codec);

    Router::new()
        .route(
            "/",
            guard.route("GET /tenants", RouteAccess::require([system::USER_READ]), get(list_tenants)),
        )
        .route(
            "/users/:user_id/applications",
            guard.route(
                "GET /tenants/users/:user_id/applications",
                RouteAccess::inherit(),
                get(user_applications),
            ),
        )
        .route(
            "/me/applications",
            guard.route("GET /tenants/me/applications", RouteAccess::inherit(), get(my_applications)),
        )
        .route(
            "/:tenant_id/apps/:app_code/config",
            guard.route(
                "GET /tenants/:tenant_id/apps/:app_code/config",
                RouteAccess::inherit(),
                get(get_app_config),
            ),
        )
        .route(
            "/:tenant_id/apps/:app_code/config",
            guard.route(
                "PUT /tenants/:tenant_id/apps/:app_code/config",
                RouteAccess::inherit(),
                axum::routing::put(update_app_config),
            ),
        )
        .route(
            "/:tenant_id/config",
            guard.route(
                "GET /tenants/:tenant_id/config",
                RouteAccess::inherit(),
                get(get_config_by_query),
            ),
        )
        .route(
            "/:tenant_id/config",
            guard.route(
                "PUT /tenants/:tenant_id/config",
                RouteAccess::inherit(),
                axum::routing::put(update_config_by_query),
            ),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /tenants - active tenants, ordered by name
pub async fn list_tenants(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Tenant>>, ApiError> {
    Ok(Json(services.tenants.list_active_tenants().await?))
}

/// GET /tenants/users/:user_id/applications
pub async fn user_applications(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<SubApplication>>, ApiError> {
    let user_id: UserId = user_id.parse()?;
    Ok(Json(services.tenants.accessible_applications(user_id).await?))
}

/// GET /tenants/me/applications
pub async fn my_applications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<SubApplication>>, ApiError> {
    Ok(Json(services.tenants.accessible_applications(identity.id()).await?))
}

/// GET /tenants/:tenant_id/apps/:app_code/config?mode=
pub async fn get_app_config(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant_id, app_code)): Path<(String, String)>,
    ApiQuery(query): ApiQuery<ModeQuery>,
) -> Result<Json<TenantAppConfig>, ApiError> {
    let tenant_id: TenantId = tenant_id.parse()?;
    let mode = ConfigMode::parse_optional(query.mode.as_deref())?;
    Ok(Json(services.config.get_config(&app_code, tenant_id, mode).await?))
}

/// PUT /tenants/:tenant_id/apps/:app_code/config
pub async fn update_app_config(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant_id, app_code)): Path<(String, String)>,
    ApiJson(patch): ApiJson<Value>,
) -> Result<Json<TenantAppConfig>, ApiError> {
    let tenant_id: TenantId = tenant_id.parse()?;
    Ok(Json(services.config.update_config(&app_code, tenant_id, patch).await?))
}

/// GET /tenants/:tenant_id/config?app_code=&mode=
pub async fn get_config_by_query(
    Extension(services): Extension<Arc<AppServices>>,
    Path(tenant_id): Path<String>,
    ApiQuery(query): ApiQuery<ConfigQuery>,
) -> Result<Json<TenantAppConfig>, ApiError> {
    let app_code = require_app_code(query.app_code.as_deref())?;
    let tenant_id: TenantId = tenant_id.parse()?;
    let mode = ConfigMode::parse_optional(query.mode.as_deref())?;
    Ok(Json(services.config.get_config(app_code, tenant_id, mode).await?))
}

/// PUT /tenants/:tenant_id/config?app_code=
pub async fn update_config_by_query(
    Extension(services): Extension<Arc<AppServices>>,
    Path(tenant_id): Path<String>,
    ApiQuery(query): ApiQuery<ConfigQuery>,
    ApiJson(patch): ApiJson<Value>,
) -> Result<Json<TenantAppConfig>, ApiError> {
    let app_code = require_app_code(query.app_code.as_deref())?;
    let tenant_id: TenantId = tenant_id.parse()?;
    Ok(Json(services.config.update_config(app_code, tenant_id, patch).await?))
}
