//! Client-facing projections of the entity records.

use serde::{Deserialize, Serialize};

use tenantgate_core::{ApplicationId, RoleId, RoleWithPermissions, SubApplication, Tenant, TenantId, User, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub tenant_id: Option<TenantId>,
    pub roles: Vec<RoleSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub id: RoleId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSummary {
    pub id: TenantId,
    pub name: String,
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub id: ApplicationId,
    pub code: String,
    pub name: String,
    pub path: Option<String>,
    pub url: Option<String>,
}

impl UserSummary {
    pub fn new(user: &User, roles: &[RoleWithPermissions]) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            tenant_id: user.tenant_id,
            roles: roles.iter().map(RoleSummary::from).collect(),
        }
    }
}

impl From<&RoleWithPermissions> for RoleSummary {
    fn from(role: &RoleWithPermissions) -> Self {
        Self {
            id: role.role.id,
            name: role.role.name.clone(),
        }
    }
}

impl From<&Tenant> for TenantSummary {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name.clone(),
            plan: tenant.plan.clone(),
        }
    }
}

impl From<&SubApplication> for ApplicationSummary {
    fn from(app: &SubApplication) -> Self {
        Self {
            id: app.id,
            code: app.code.clone(),
            name: app.name.clone(),
            path: app.path.clone(),
            url: app.url.clone(),
        }
    }
}
