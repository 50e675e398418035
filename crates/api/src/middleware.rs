use std::sync::Arc;

use axum::{
    extract::State,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use chrono::Utc;

use tenantgate_auth::TokenCodec;

use crate::access::{ResolvedAccess, RouteAccess};
use crate::app::errors::ApiError;
use crate::guards::{GuardContext, bearer_token, check_access};

#[derive(Clone)]
pub struct AccessState {
    pub route: &'static str,
    pub access: Arc<ResolvedAccess>,
    pub codec: Arc<dyn TokenCodec>,
}

/// Runs the guard chain for one route; on success the `Identity` (if any) is
/// inserted into the request extensions before the handler runs.
pub async fn access_middleware(
    State(state): State<AccessState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let outcome = {
        let mut ctx = GuardContext::new(&state.access, bearer_token(req.headers()));
        check_access(&mut ctx, state.codec.as_ref(), Utc::now()).map(|()| ctx.into_identity())
    };

    match outcome {
        Ok(identity) => {
            if let Some(identity) = identity {
                req.extensions_mut().insert(identity);
            }
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(route = state.route, kind = err.kind().as_str(), "request rejected by access guard");
            ApiError(err).into_response()
        }
    }
}

/// Attaches guard layers to routes of one controller.
#[derive(Clone)]
pub struct Guarded {
    controller: RouteAccess,
    codec: Arc<dyn TokenCodec>,
}

impl Guarded {
    pub fn new(controller: RouteAccess, codec: Arc<dyn TokenCodec>) -> Self {
        Self { controller, codec }
    }

    pub fn route<S>(&self, route: &'static str, handler: RouteAccess, method_router: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let state = AccessState {
            route,
            access: Arc::new(RouteAccess::resolve(&self.controller, &handler)),
            codec: self.codec.clone(),
        };
        method_router.route_layer(axum::middleware::from_fn_with_state(state, access_middleware))
    }
}
