//! In-memory identity store for tests/dev.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use tenantgate_core::{
    ApplicationId, Entity, Pairing, PairingWithApplication, Permission, PermissionId, Role,
    RoleId, RoleWithPermissions, Settings, SubApplication, Tenant, TenantId, TenantWithPairings,
    User, UserGraph, UserId, merge_settings,
};
use tenantgate_tenancy::{IdentityStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, Permission>,
    tenants: HashMap<TenantId, Tenant>,
    applications: HashMap<ApplicationId, SubApplication>,
    pairings: HashMap<(TenantId, ApplicationId), Pairing>,
}

/// Relations are stored by id and resolved on read, so a role's permissions
/// always reflect the current role record.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    inner: RwLock<Tables>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("identity store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("identity store lock poisoned".to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Bootstrap writes (seed only; the core never calls these)
    // ─────────────────────────────────────────────────────────────────────

    pub fn insert_permission(&self, permission: Permission) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.permissions.values().any(|p| p.code == permission.code && p.id != permission.id) {
            return Err(StoreError::Backend(format!(
                "duplicate permission code '{}'",
                permission.code
            )));
        }
        t.permissions.insert(*permission.id(), permission);
        Ok(())
    }

    pub fn insert_role(&self, role: Role) -> Result<(), StoreError> {
        self.write()?.roles.insert(*role.id(), role);
        Ok(())
    }

    pub fn insert_user(&self, mut user: User) -> Result<(), StoreError> {
        user.email = user.email.trim().to_lowercase();
        let mut t = self.write()?;
        if t.users.values().any(|u| u.email == user.email && u.id != user.id) {
            return Err(StoreError::Backend(format!("duplicate email '{}'", user.email)));
        }
        t.users.insert(*user.id(), user);
        Ok(())
    }

    pub fn insert_tenant(&self, tenant: Tenant) -> Result<(), StoreError> {
        self.write()?.tenants.insert(*tenant.id(), tenant);
        Ok(())
    }

    pub fn insert_application(&self, app: SubApplication) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.applications.values().any(|a| a.code == app.code && a.id != app.id) {
            return Err(StoreError::Backend(format!("duplicate application code '{}'", app.code)));
        }
        t.applications.insert(*app.id(), app);
        Ok(())
    }

    pub fn insert_pairing(&self, pairing: Pairing) -> Result<(), StoreError> {
        self.write()?.pairings.insert(pairing.key(), pairing);
        Ok(())
    }

    pub fn has_users(&self) -> Result<bool, StoreError> {
        Ok(!self.read()?.users.is_empty())
    }

    /// Find a permission row by code.
    pub fn permission_by_code(&self, code: &str) -> Result<Option<Permission>, StoreError> {
        Ok(self.read()?.permissions.values().find(|p| p.code == code).cloned())
    }
}

impl Tables {
    fn role_with_permissions(&self, role: &Role) -> RoleWithPermissions {
        RoleWithPermissions {
            role: role.clone(),
            permissions: role
                .permission_ids
                .iter()
                .filter_map(|id| self.permissions.get(id).cloned())
                .collect(),
        }
    }

    fn pairing_with_application(&self, pairing: &Pairing) -> Option<PairingWithApplication> {
        let application = self.applications.get(&pairing.application_id)?.clone();
        Some(PairingWithApplication {
            pairing: pairing.clone(),
            application,
        })
    }

    fn tenant_with_pairings(&self, tenant_id: TenantId) -> Option<TenantWithPairings> {
        let tenant = self.tenants.get(&tenant_id)?.clone();
        let pairings = self
            .pairings
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .filter_map(|p| self.pairing_with_application(p))
            .collect();
        Some(TenantWithPairings { tenant, pairings })
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.trim().to_lowercase();
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn load_user_graph(&self, user_id: UserId) -> Result<Option<UserGraph>, StoreError> {
        let t = self.read()?;
        let Some(user) = t.users.get(&user_id).cloned() else {
            return Ok(None);
        };

        let roles = user
            .role_ids
            .iter()
            .filter_map(|id| t.roles.get(id))
            .map(|role| t.role_with_permissions(role))
            .collect();
        let tenant = user.tenant_id.and_then(|id| t.tenant_with_pairings(id));

        Ok(Some(UserGraph { user, roles, tenant }))
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        Ok(self.read()?.tenants.values().cloned().collect())
    }

    async fn find_tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, StoreError> {
        Ok(self.read()?.tenants.get(&tenant_id).cloned())
    }

    async fn find_pairing(
        &self,
        tenant_id: TenantId,
        app_code: &str,
    ) -> Result<Option<PairingWithApplication>, StoreError> {
        let t = self.read()?;
        let Some(app) = t.applications.values().find(|a| a.code == app_code) else {
            return Ok(None);
        };
        Ok(t.pairings
            .get(&(tenant_id, app.id))
            .and_then(|p| t.pairing_with_application(p)))
    }

    async fn merge_pairing_settings(
        &self,
        tenant_id: TenantId,
        application_id: ApplicationId,
        patch: &Settings,
    ) -> Result<Option<Pairing>, StoreError> {
        // Read, merge and write under one guard: the unit is atomic.
        let mut t = self.write()?;
        let Some(pairing) = t.pairings.get_mut(&(tenant_id, application_id)) else {
            return Ok(None);
        };
        pairing.settings = merge_settings(&pairing.settings, patch);
        Ok(Some(pairing.clone()))
    }
}
