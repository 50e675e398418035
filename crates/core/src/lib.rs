//! `tenantgate-core`: shared building blocks for identity and tenancy.
//!
//! This crate contains plain data (ids, entity records, settings) and the
//! error taxonomy every other crate converts into. No IO lives here.

pub mod entity;
pub mod error;
pub mod id;
pub mod models;
pub mod settings;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{ApplicationId, PermissionId, RoleId, TenantId, UserId};
pub use models::{
    Pairing, PairingWithApplication, Permission, PermissionType, Role, RoleWithPermissions,
    Status, SubApplication, Tenant, TenantWithPairings, User, UserGraph,
};
pub use settings::{Settings, merge_settings, settings_from_value};
