//! Bootstrap seed: the catalog permissions, the built-in roles, one tenant
//! with its sub-applications, and an administrator account.
//!
//! Entity creation is outside the request-serving core; this module is the
//! only writer apart from the pairing settings merge.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use tenantgate_auth::catalog::{RoleTemplate, seed_permissions};
use tenantgate_auth::{AuthError, BcryptComparator, PermissionCode};
use tenantgate_core::{
    ApplicationId, DomainError, Pairing, Permission, Role, RoleId, Settings, Status,
    SubApplication, Tenant, TenantId, User, UserId,
};
use tenantgate_tenancy::StoreError;

use crate::identity::InMemoryIdentityStore;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("password hashing task failed: {0}")]
    Join(String),
}

impl From<SeedError> for DomainError {
    fn from(err: SeedError) -> Self {
        match err {
            SeedError::Store(e) => e.into(),
            SeedError::Auth(e) => e.into(),
            SeedError::Join(msg) => DomainError::internal(msg),
        }
    }
}

/// Write side used only by the seed.
#[async_trait]
pub trait SeedTarget: Send + Sync {
    /// True when at least one user exists; the seed is then skipped.
    async fn is_seeded(&self) -> Result<bool, StoreError>;
    async fn insert_permission(&self, permission: Permission) -> Result<(), StoreError>;
    async fn insert_role(&self, role: Role) -> Result<(), StoreError>;
    async fn insert_tenant(&self, tenant: Tenant) -> Result<(), StoreError>;
    async fn insert_application(&self, app: SubApplication) -> Result<(), StoreError>;
    async fn insert_pairing(&self, pairing: Pairing) -> Result<(), StoreError>;
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct SeedApp {
    pub code: String,
    pub name: String,
}

impl SeedApp {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub admin_email: String,
    pub admin_password: String,
    pub tenant_name: String,
    pub apps: Vec<SeedApp>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            admin_email: "admin@example.com".to_string(),
            admin_password: "admin123".to_string(),
            tenant_name: "Default Tenant".to_string(),
            apps: vec![
                SeedApp::new("einvoice", "E-Invoice"),
                SeedApp::new("crm", "CRM"),
                SeedApp::new("hr", "HR"),
            ],
        }
    }
}

/// Ids of what the seed created.
#[derive(Debug, Clone)]
pub struct SeedReport {
    pub tenant_id: TenantId,
    pub admin_id: UserId,
    pub super_admin_role: RoleId,
    pub tenant_admin_role: RoleId,
    pub member_role: RoleId,
    pub applications: Vec<(String, ApplicationId)>,
}

impl SeedReport {
    pub fn application(&self, code: &str) -> Option<ApplicationId> {
        self.applications
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, id)| *id)
    }
}

/// Seed `target` unless it already holds users (`Ok(None)` in that case).
pub async fn seed<T: SeedTarget + ?Sized>(
    target: &T,
    hasher: &BcryptComparator,
    config: &SeedConfig,
) -> Result<Option<SeedReport>, SeedError> {
    if target.is_seeded().await? {
        info!("identity store already seeded; skipping");
        return Ok(None);
    }

    let app_codes: Vec<&str> = config.apps.iter().map(|a| a.code.as_str()).collect();

    let permissions = seed_permissions(&app_codes)?;
    for permission in &permissions {
        target.insert_permission(permission.clone()).await?;
    }

    let tenant = Tenant {
        id: TenantId::new(),
        name: config.tenant_name.clone(),
        status: Status::Active,
        plan: "enterprise".to_string(),
        settings: default_tenant_settings(),
    };
    target.insert_tenant(tenant.clone()).await?;

    let role_for = |template: RoleTemplate, tenant_id: Option<TenantId>| -> Result<Role, SeedError> {
        let codes = template.codes(&app_codes)?;
        Ok(Role {
            id: RoleId::new(),
            name: template.name().to_string(),
            tenant_id,
            permission_ids: permission_ids(&permissions, &codes),
        })
    };
    let super_admin = role_for(RoleTemplate::SuperAdmin, None)?;
    let tenant_admin = role_for(RoleTemplate::TenantAdmin, Some(tenant.id))?;
    let member = role_for(RoleTemplate::Member, Some(tenant.id))?;
    for role in [&super_admin, &tenant_admin, &member] {
        target.insert_role(role.clone()).await?;
    }

    let mut applications = Vec::with_capacity(config.apps.len());
    for app in &config.apps {
        let application = SubApplication {
            id: ApplicationId::new(),
            code: app.code.clone(),
            name: app.name.clone(),
            status: Status::Active,
            path: Some(format!("/apps/{}", app.code)),
            url: None,
        };
        target.insert_application(application.clone()).await?;
        target
            .insert_pairing(Pairing {
                tenant_id: tenant.id,
                application_id: application.id,
                status: Status::Active,
                settings: Settings::new(),
            })
            .await?;
        applications.push((application.code, application.id));
    }

    let hasher = *hasher;
    let password = config.admin_password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| SeedError::Join(e.to_string()))??;

    let admin = User {
        id: UserId::new(),
        email: config.admin_email.trim().to_lowercase(),
        name: "Administrator".to_string(),
        tenant_id: Some(tenant.id),
        role_ids: vec![super_admin.id],
        status: Status::Active,
        password_hash,
    };
    target.insert_user(admin.clone()).await?;

    info!(
        tenant_id = %tenant.id,
        admin_email = %admin.email,
        applications = applications.len(),
        "seeded identity store"
    );

    Ok(Some(SeedReport {
        tenant_id: tenant.id,
        admin_id: admin.id,
        super_admin_role: super_admin.id,
        tenant_admin_role: tenant_admin.id,
        member_role: member.id,
        applications,
    }))
}

/// Build and seed a fresh in-memory store.
pub async fn seed_in_memory(
    hasher: &BcryptComparator,
    config: &SeedConfig,
) -> Result<(InMemoryIdentityStore, SeedReport), SeedError> {
    let store = InMemoryIdentityStore::new();
    let report = seed(&store, hasher, config)
        .await?
        .ok_or_else(|| StoreError::Backend("fresh store reported as seeded".to_string()))?;
    Ok((store, report))
}

fn default_tenant_settings() -> Settings {
    let mut settings = Settings::new();
    settings.insert("locale".to_string(), json!("en"));
    settings.insert("timezone".to_string(), json!("UTC"));
    settings
}

fn permission_ids(rows: &[Permission], codes: &[PermissionCode]) -> Vec<tenantgate_core::PermissionId> {
    codes
        .iter()
        .filter_map(|code| rows.iter().find(|p| p.code == code.as_str()).map(|p| p.id))
        .collect()
}

#[async_trait]
impl SeedTarget for InMemoryIdentityStore {
    async fn is_seeded(&self) -> Result<bool, StoreError> {
        self.has_users()
    }

    async fn insert_permission(&self, permission: Permission) -> Result<(), StoreError> {
        InMemoryIdentityStore::insert_permission(self, permission)
    }

    async fn insert_role(&self, role: Role) -> Result<(), StoreError> {
        InMemoryIdentityStore::insert_role(self, role)
    }

    async fn insert_tenant(&self, tenant: Tenant) -> Result<(), StoreError> {
        InMemoryIdentityStore::insert_tenant(self, tenant)
    }

    async fn insert_application(&self, app: SubApplication) -> Result<(), StoreError> {
        InMemoryIdentityStore::insert_application(self, app)
    }

    async fn insert_pairing(&self, pairing: Pairing) -> Result<(), StoreError> {
        InMemoryIdentityStore::insert_pairing(self, pairing)
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        InMemoryIdentityStore::insert_user(self, user)
    }
}
