//! HTTP API: access decision engine, routing, and request/response mapping.

pub mod access;
pub mod app;
pub mod config;
pub mod context;
pub mod guards;
pub mod middleware;

pub use access::{ResolvedAccess, RouteAccess};
pub use app::build_app;
pub use app::services::{AppServices, build_services};
pub use config::ApiConfig;
pub use context::Identity;
