use std::sync::Arc;

use axum::Router;

use tenantgate_auth::TokenCodec;

pub mod auth;
pub mod system;
pub mod tenants;

/// Every guarded endpoint. Each route carries its own access layer.
pub fn router(codec: Arc<dyn TokenCodec>) -> Router {
    Router::new()
        .nest("/auth", auth::router(codec.clone()))
        .nest("/tenants", tenants::router(codec))
}
