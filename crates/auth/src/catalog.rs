//! Static permission taxonomy and built-in role templates.
//!
//! The bootstrap seed materializes these into `Permission`/`Role` rows.

use tenantgate_core::{Permission, PermissionId, PermissionType};

use crate::error::AuthError;
use crate::permissions::PermissionCode;

pub mod system {
    use super::PermissionCode;

    pub const USER_READ: PermissionCode = PermissionCode::from_static("system:user:read");
    pub const USER_CREATE: PermissionCode = PermissionCode::from_static("system:user:create");
    pub const USER_UPDATE: PermissionCode = PermissionCode::from_static("system:user:update");
    pub const USER_DELETE: PermissionCode = PermissionCode::from_static("system:user:delete");
    pub const ROLE_READ: PermissionCode = PermissionCode::from_static("system:role:read");
    pub const ROLE_MANAGE: PermissionCode = PermissionCode::from_static("system:role:manage");
    pub const TENANT_READ: PermissionCode = PermissionCode::from_static("system:tenant:read");
    pub const TENANT_MANAGE: PermissionCode = PermissionCode::from_static("system:tenant:manage");
    pub const APP_READ: PermissionCode = PermissionCode::from_static("system:app:read");
    pub const APP_MANAGE: PermissionCode = PermissionCode::from_static("system:app:manage");

    pub const ALL: [PermissionCode; 10] = [
        USER_READ,
        USER_CREATE,
        USER_UPDATE,
        USER_DELETE,
        ROLE_READ,
        ROLE_MANAGE,
        TENANT_READ,
        TENANT_MANAGE,
        APP_READ,
        APP_MANAGE,
    ];
}

/// Built-in role templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTemplate {
    /// Every system code and every application.
    SuperAdmin,
    /// Day-to-day tenant administration plus every application.
    TenantAdmin,
    /// Application access only.
    Member,
}

impl RoleTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            RoleTemplate::SuperAdmin => "super_admin",
            RoleTemplate::TenantAdmin => "tenant_admin",
            RoleTemplate::Member => "member",
        }
    }

    /// System codes granted by the template (application access is added per app).
    pub fn system_codes(&self) -> Vec<PermissionCode> {
        match self {
            RoleTemplate::SuperAdmin => system::ALL.to_vec(),
            RoleTemplate::TenantAdmin => vec![
                system::USER_READ,
                system::USER_CREATE,
                system::USER_UPDATE,
                system::ROLE_READ,
                system::TENANT_READ,
            ],
            RoleTemplate::Member => Vec::new(),
        }
    }

    /// Full code list for a deployment offering `app_codes`.
    pub fn codes(&self, app_codes: &[&str]) -> Result<Vec<PermissionCode>, AuthError> {
        let mut codes = self.system_codes();
        for app in app_codes {
            codes.push(PermissionCode::app_access(app)?);
        }
        Ok(codes)
    }
}

/// Turn a code into a permission row (type/resource/action derived from the code).
pub fn permission_row(code: &PermissionCode) -> Permission {
    let kind = if code.access_app().is_some() {
        PermissionType::App
    } else if code.scope() == "system" {
        PermissionType::System
    } else {
        PermissionType::Api
    };
    Permission {
        id: PermissionId::new(),
        code: code.as_str().to_string(),
        kind,
        resource: code.resource().to_string(),
        action: code.action().to_string(),
    }
}

/// Every permission row a deployment with `app_codes` needs.
pub fn seed_permissions(app_codes: &[&str]) -> Result<Vec<Permission>, AuthError> {
    let mut rows: Vec<Permission> = system::ALL.iter().map(permission_row).collect();
    for app in app_codes {
        rows.push(permission_row(&PermissionCode::app_access(app)?));
    }
    Ok(rows)
}
