//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: identity store selection and use-case services
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs
//! - `extract.rs`: body/query extractors with JSON rejections
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub mod dto;
pub mod extract;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: AppServicesHandle) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let guarded = routes::router(services.codec.clone()).layer(Extension(services));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(guarded)
        .layer(ServiceBuilder::new().layer(trace_layer))
}

pub type AppServicesHandle = Arc<services::AppServices>;
