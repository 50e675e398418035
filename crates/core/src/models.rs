//! Entity records and the eager-loaded graphs the identity store returns.
//!
//! Records are created by the bootstrap seed; the only mutation this workspace
//! performs is a settings merge on `Pairing`.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::DomainError;
use crate::id::{ApplicationId, PermissionId, RoleId, TenantId, UserId};
use crate::settings::Settings;

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle status shared by users, tenants, applications and pairings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl Status {
    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
            Status::Suspended => "suspended",
        }
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Status::Active),
            "inactive" => Ok(Status::Inactive),
            "suspended" => Ok(Status::Suspended),
            other => Err(DomainError::bad_request(format!("unknown status '{other}'"))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Permission / Role
// ─────────────────────────────────────────────────────────────────────────────

/// Coarse classification of a permission row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    System,
    App,
    Menu,
    Api,
}

impl PermissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionType::System => "system",
            PermissionType::App => "app",
            PermissionType::Menu => "menu",
            PermissionType::Api => "api",
        }
    }
}

impl FromStr for PermissionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(PermissionType::System),
            "app" => Ok(PermissionType::App),
            "menu" => Ok(PermissionType::Menu),
            "api" => Ok(PermissionType::Api),
            other => Err(DomainError::bad_request(format!("unknown permission type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    /// Globally unique, `<scope>:<resource>:<action>`.
    pub code: String,
    #[serde(rename = "type")]
    pub kind: PermissionType,
    pub resource: String,
    pub action: String,
}

/// A role references its permissions by id; the store resolves them on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    /// `None` for system roles, `Some` for tenant-scoped roles.
    pub tenant_id: Option<TenantId>,
    pub permission_ids: Vec<PermissionId>,
}

impl Role {
    pub fn is_system(&self) -> bool {
        self.tenant_id.is_none()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User / Tenant / SubApplication / Pairing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub tenant_id: Option<TenantId>,
    pub role_ids: Vec<RoleId>,
    pub status: Status,
    /// Only read by login; never serialized to clients.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub status: Status,
    pub plan: String,
    /// Default settings applied to every paired application in `merge` mode.
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubApplication {
    pub id: ApplicationId,
    pub code: String,
    pub name: String,
    pub status: Status,
    pub path: Option<String>,
    pub url: Option<String>,
}

/// Entitlement edge between a tenant and a sub-application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub tenant_id: TenantId,
    pub application_id: ApplicationId,
    pub status: Status,
    pub settings: Settings,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for Permission {
    type Id = PermissionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for Tenant {
    type Id = TenantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for SubApplication {
    type Id = ApplicationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Pairing {
    /// Composite (tenant, application) key.
    pub fn key(&self) -> (TenantId, ApplicationId) {
        (self.tenant_id, self.application_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Eager-loaded graphs
// ─────────────────────────────────────────────────────────────────────────────

/// A role with its permission rows resolved from the role→permission join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleWithPermissions {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// A pairing together with the application it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingWithApplication {
    pub pairing: Pairing,
    pub application: SubApplication,
}

impl PairingWithApplication {
    /// Usable only when both the edge and the application are active.
    pub fn is_usable(&self) -> bool {
        self.pairing.status.is_active() && self.application.status.is_active()
    }
}

/// A tenant with all of its pairings (any status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantWithPairings {
    pub tenant: Tenant,
    pub pairings: Vec<PairingWithApplication>,
}

/// User → Role → Permission and User → Tenant → Pairing → SubApplication.
///
/// Missing relations are represented as `None` / empty vectors, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGraph {
    pub user: User,
    pub roles: Vec<RoleWithPermissions>,
    pub tenant: Option<TenantWithPairings>,
}
