//! `tenantgate-tenancy`: tenant-facing use cases over the identity store.
//!
//! - `store`: the collaborator contract (eager-loading identity store)
//! - `resolver`: which sub-applications a user can reach
//! - `app_config`: per-tenant, per-application settings (merge/standalone)
//! - `auth_service`: login and token verification

pub mod app_config;
pub mod auth_service;
pub mod resolver;
pub mod store;
pub mod views;

pub use app_config::{ConfigMode, ConfigResolver, TenantAppConfig, require_app_code};
pub use auth_service::{AuthService, LoginResponse, VerifiedAuth};
pub use resolver::{TenantResolver, reachable_applications};
pub use store::{IdentityStore, StoreError};
pub use views::{ApplicationSummary, RoleSummary, TenantSummary, UserSummary};
