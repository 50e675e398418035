//! Postgres-backed identity store.
//!
//! Relations are resolved with explicit joins on every graph load. The one
//! mutation, the pairing settings merge, is a single `UPDATE ... RETURNING`
//! statement using the jsonb `||` operator, which is a shallow merge with the
//! right-hand side winning.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | Database / PoolClosed / Io / other | `Backend` |
//! | ColumnDecode / Decode / bad status text | `Corrupt` |

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tokio::sync::Mutex;
use tracing::instrument;

use tenantgate_auth::BcryptComparator;

use tenantgate_core::{
    ApplicationId, Pairing, PairingWithApplication, Permission, PermissionId, PermissionType,
    Role, RoleId, RoleWithPermissions, Settings, Status, SubApplication, Tenant, TenantId,
    TenantWithPairings, User, UserGraph, UserId,
};
use tenantgate_tenancy::{IdentityStore, StoreError};

use crate::seed::{SeedConfig, SeedError, SeedReport, SeedTarget, seed};

const SCHEMA: &str = include_str!("../../migrations/0001_identity.sql");

#[derive(Debug, Clone)]
pub struct PostgresIdentityStore {
    pool: Arc<PgPool>,
}

impl PostgresIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema. Every statement is `IF NOT EXISTS`.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn roles_for_user(&self, user_id: UserId) -> Result<Vec<RoleWithPermissions>, StoreError> {
        let role_rows = sqlx::query(
            r#"
            SELECT r.id, r.name, r.tenant_id
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_user_roles", e))?;

        let roles = role_rows
            .iter()
            .map(RoleRow::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_role", e))?;
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let role_ids: Vec<uuid::Uuid> = roles.iter().map(|r| r.id).collect();
        let permission_rows = sqlx::query(
            r#"
            SELECT rp.role_id, p.id, p.code, p.type, p.resource, p.action
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = ANY($1)
            ORDER BY p.code ASC
            "#,
        )
        .bind(role_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_role_permissions", e))?;

        let mut by_role: HashMap<uuid::Uuid, Vec<Permission>> = HashMap::new();
        for row in &permission_rows {
            let role_id: uuid::Uuid = row.try_get("role_id").map_err(|e| map_sqlx_error("decode_permission", e))?;
            let permission = PermissionRow::from_row(row)
                .map_err(|e| map_sqlx_error("decode_permission", e))?
                .into_permission()?;
            by_role.entry(role_id).or_default().push(permission);
        }

        Ok(roles
            .into_iter()
            .map(|row| {
                let permissions = by_role.remove(&row.id).unwrap_or_default();
                RoleWithPermissions {
                    role: Role {
                        id: RoleId::from_uuid(row.id),
                        name: row.name,
                        tenant_id: row.tenant_id.map(TenantId::from_uuid),
                        permission_ids: permissions.iter().map(|p| p.id).collect(),
                    },
                    permissions,
                }
            })
            .collect())
    }

    async fn pairings_for_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<PairingWithApplication>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                p.tenant_id, p.application_id, p.status AS pairing_status, p.settings,
                a.code, a.name, a.status AS app_status, a.path, a.url
            FROM pairings p
            JOIN applications a ON a.id = p.application_id
            WHERE p.tenant_id = $1
            ORDER BY a.code ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_pairings", e))?;

        rows.iter()
            .map(|row| {
                PairingRow::from_row(row)
                    .map_err(|e| map_sqlx_error("decode_pairing", e))?
                    .into_pairing()
            })
            .collect()
    }
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    #[instrument(skip(self), err)]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, tenant_id, status, password_hash
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user = UserRow::from_row(&row).map_err(|e| map_sqlx_error("decode_user", e))?;
        let role_ids = self.role_ids_for_user(user.id).await?;
        Ok(Some(user.into_user(role_ids)?))
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn load_user_graph(&self, user_id: UserId) -> Result<Option<UserGraph>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, tenant_id, status, password_hash
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_user", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user_row = UserRow::from_row(&row).map_err(|e| map_sqlx_error("decode_user", e))?;
        let roles = self.roles_for_user(user_id).await?;
        let user = user_row.into_user(roles.iter().map(|r| r.role.id).collect())?;

        let tenant = match user.tenant_id {
            Some(tenant_id) => match self.find_tenant(tenant_id).await? {
                Some(tenant) => Some(TenantWithPairings {
                    pairings: self.pairings_for_tenant(tenant_id).await?,
                    tenant,
                }),
                None => None,
            },
            None => None,
        };

        Ok(Some(UserGraph { user, roles, tenant }))
    }

    #[instrument(skip(self), err)]
    async fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        let rows = sqlx::query("SELECT id, name, status, plan, settings FROM tenants ORDER BY name ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_tenants", e))?;

        rows.iter()
            .map(|row| {
                TenantRow::from_row(row)
                    .map_err(|e| map_sqlx_error("decode_tenant", e))?
                    .into_tenant()
            })
            .collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn find_tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, StoreError> {
        let row = sqlx::query("SELECT id, name, status, plan, settings FROM tenants WHERE id = $1")
            .bind(tenant_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_tenant", e))?;

        row.map(|row| {
            TenantRow::from_row(&row)
                .map_err(|e| map_sqlx_error("decode_tenant", e))?
                .into_tenant()
        })
        .transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn find_pairing(
        &self,
        tenant_id: TenantId,
        app_code: &str,
    ) -> Result<Option<PairingWithApplication>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                p.tenant_id, p.application_id, p.status AS pairing_status, p.settings,
                a.code, a.name, a.status AS app_status, a.path, a.url
            FROM pairings p
            JOIN applications a ON a.id = p.application_id
            WHERE p.tenant_id = $1 AND a.code = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(app_code)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_pairing", e))?;

        row.map(|row| {
            PairingRow::from_row(&row)
                .map_err(|e| map_sqlx_error("decode_pairing", e))?
                .into_pairing()
        })
        .transpose()
    }

    #[instrument(skip(self, patch), fields(tenant_id = %tenant_id, application_id = %application_id), err)]
    async fn merge_pairing_settings(
        &self,
        tenant_id: TenantId,
        application_id: ApplicationId,
        patch: &Settings,
    ) -> Result<Option<Pairing>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE pairings
            SET settings = settings || $3::jsonb,
                updated_at = NOW()
            WHERE tenant_id = $1 AND application_id = $2
            RETURNING tenant_id, application_id, status, settings
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(application_id.as_uuid())
        .bind(Value::Object(patch.clone()))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("merge_pairing_settings", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let decode = |e| map_sqlx_error("decode_pairing", e);
        let status: String = row.try_get("status").map_err(decode)?;
        let settings: Value = row.try_get("settings").map_err(decode)?;
        Ok(Some(Pairing {
            tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(decode)?),
            application_id: ApplicationId::from_uuid(row.try_get("application_id").map_err(decode)?),
            status: parse_status(&status)?,
            settings: settings_object(settings)?,
        }))
    }
}

impl PostgresIdentityStore {
    async fn role_ids_for_user(&self, user_id: uuid::Uuid) -> Result<Vec<RoleId>, StoreError> {
        let ids: Vec<uuid::Uuid> = sqlx::query_scalar("SELECT role_id FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_user_role_ids", e))?;
        Ok(ids.into_iter().map(RoleId::from_uuid).collect())
    }
}

/// Map SQLx errors to StoreError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(format!("{} in {}", err, operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn parse_status(raw: &str) -> Result<Status, StoreError> {
    Status::from_str(raw).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn settings_object(value: Value) -> Result<Settings, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Corrupt(format!("settings column is not an object: {other}"))),
    }
}

// SQLx row types

#[derive(Debug)]
struct UserRow {
    id: uuid::Uuid,
    email: String,
    name: String,
    tenant_id: Option<uuid::Uuid>,
    status: String,
    password_hash: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for UserRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            tenant_id: row.try_get("tenant_id")?,
            status: row.try_get("status")?,
            password_hash: row.try_get("password_hash")?,
        })
    }
}

impl UserRow {
    fn into_user(self, role_ids: Vec<RoleId>) -> Result<User, StoreError> {
        Ok(User {
            id: UserId::from_uuid(self.id),
            email: self.email,
            name: self.name,
            tenant_id: self.tenant_id.map(TenantId::from_uuid),
            role_ids,
            status: parse_status(&self.status)?,
            password_hash: self.password_hash,
        })
    }
}

#[derive(Debug)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    tenant_id: Option<uuid::Uuid>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for RoleRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(RoleRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            tenant_id: row.try_get("tenant_id")?,
        })
    }
}

#[derive(Debug)]
struct PermissionRow {
    id: uuid::Uuid,
    code: String,
    kind: String,
    resource: String,
    action: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for PermissionRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(PermissionRow {
            id: row.try_get("id")?,
            code: row.try_get("code")?,
            kind: row.try_get("type")?,
            resource: row.try_get("resource")?,
            action: row.try_get("action")?,
        })
    }
}

impl PermissionRow {
    fn into_permission(self) -> Result<Permission, StoreError> {
        Ok(Permission {
            id: PermissionId::from_uuid(self.id),
            code: self.code,
            kind: PermissionType::from_str(&self.kind).map_err(|e| StoreError::Corrupt(e.to_string()))?,
            resource: self.resource,
            action: self.action,
        })
    }
}

#[derive(Debug)]
struct TenantRow {
    id: uuid::Uuid,
    name: String,
    status: String,
    plan: String,
    settings: Value,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for TenantRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(TenantRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            status: row.try_get("status")?,
            plan: row.try_get("plan")?,
            settings: row.try_get("settings")?,
        })
    }
}

impl TenantRow {
    fn into_tenant(self) -> Result<Tenant, StoreError> {
        Ok(Tenant {
            id: TenantId::from_uuid(self.id),
            name: self.name,
            status: parse_status(&self.status)?,
            plan: self.plan,
            settings: settings_object(self.settings)?,
        })
    }
}

#[derive(Debug)]
struct PairingRow {
    tenant_id: uuid::Uuid,
    application_id: uuid::Uuid,
    pairing_status: String,
    settings: Value,
    code: String,
    name: String,
    app_status: String,
    path: Option<String>,
    url: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for PairingRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(PairingRow {
            tenant_id: row.try_get("tenant_id")?,
            application_id: row.try_get("application_id")?,
            pairing_status: row.try_get("pairing_status")?,
            settings: row.try_get("settings")?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            app_status: row.try_get("app_status")?,
            path: row.try_get("path")?,
            url: row.try_get("url")?,
        })
    }
}

impl PairingRow {
    fn into_pairing(self) -> Result<PairingWithApplication, StoreError> {
        Ok(PairingWithApplication {
            pairing: Pairing {
                tenant_id: TenantId::from_uuid(self.tenant_id),
                application_id: ApplicationId::from_uuid(self.application_id),
                status: parse_status(&self.pairing_status)?,
                settings: settings_object(self.settings)?,
            },
            application: SubApplication {
                id: ApplicationId::from_uuid(self.application_id),
                code: self.code,
                name: self.name,
                status: parse_status(&self.app_status)?,
                path: self.path,
                url: self.url,
            },
        })
    }
}

// Seed writes

/// Arbitrary key for the advisory lock that serializes concurrent seeders.
const SEED_LOCK_KEY: i64 = 0x7465_6e61_6e74;

impl PostgresIdentityStore {
    /// Run the bootstrap seed inside one transaction. A failure at any step
    /// rolls back every row written so far, so the next start sees an empty
    /// store and seeds again.
    #[instrument(skip_all, err)]
    pub async fn seed(
        &self,
        hasher: &BcryptComparator,
        config: &SeedConfig,
    ) -> Result<Option<SeedReport>, SeedError> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_seed", e))?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SEED_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("seed_lock", e))?;

        let target = SeedTransaction { tx: Mutex::new(tx) };
        let report = seed(&target, hasher, config).await?;
        target
            .tx
            .into_inner()
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_seed", e))?;
        Ok(report)
    }
}

/// Seed writes bound to one open transaction. Dropping it uncommitted rolls
/// everything back.
struct SeedTransaction {
    tx: Mutex<Transaction<'static, Postgres>>,
}

#[async_trait]
impl SeedTarget for SeedTransaction {
    async fn is_seeded(&self) -> Result<bool, StoreError> {
        let mut tx = self.tx.lock().await;
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users)")
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("is_seeded", e))?;
        Ok(exists)
    }

    async fn insert_permission(&self, permission: Permission) -> Result<(), StoreError> {
        let mut tx = self.tx.lock().await;
        sqlx::query("INSERT INTO permissions (id, code, type, resource, action) VALUES ($1, $2, $3, $4, $5)")
            .bind(permission.id.as_uuid())
            .bind(&permission.code)
            .bind(permission.kind.as_str())
            .bind(&permission.resource)
            .bind(&permission.action)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_permission", e))?;
        Ok(())
    }

    async fn insert_role(&self, role: Role) -> Result<(), StoreError> {
        let mut tx = self.tx.lock().await;
        sqlx::query("INSERT INTO roles (id, name, tenant_id) VALUES ($1, $2, $3)")
            .bind(role.id.as_uuid())
            .bind(&role.name)
            .bind(role.tenant_id.map(|t| *t.as_uuid()))
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_role", e))?;
        for permission_id in &role.permission_ids {
            sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
                .bind(role.id.as_uuid())
                .bind(permission_id.as_uuid())
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("insert_role_permission", e))?;
        }
        Ok(())
    }

    async fn insert_tenant(&self, tenant: Tenant) -> Result<(), StoreError> {
        let mut tx = self.tx.lock().await;
        sqlx::query("INSERT INTO tenants (id, name, status, plan, settings) VALUES ($1, $2, $3, $4, $5)")
            .bind(tenant.id.as_uuid())
            .bind(&tenant.name)
            .bind(tenant.status.as_str())
            .bind(&tenant.plan)
            .bind(Value::Object(tenant.settings))
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_tenant", e))?;
        Ok(())
    }

    async fn insert_application(&self, app: SubApplication) -> Result<(), StoreError> {
        let mut tx = self.tx.lock().await;
        sqlx::query("INSERT INTO applications (id, code, name, status, path, url) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(app.id.as_uuid())
            .bind(&app.code)
            .bind(&app.name)
            .bind(app.status.as_str())
            .bind(&app.path)
            .bind(&app.url)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_application", e))?;
        Ok(())
    }

    async fn insert_pairing(&self, pairing: Pairing) -> Result<(), StoreError> {
        let mut tx = self.tx.lock().await;
        sqlx::query("INSERT INTO pairings (tenant_id, application_id, status, settings) VALUES ($1, $2, $3, $4)")
            .bind(pairing.tenant_id.as_uuid())
            .bind(pairing.application_id.as_uuid())
            .bind(pairing.status.as_str())
            .bind(Value::Object(pairing.settings))
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_pairing", e))?;
        Ok(())
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut tx = self.tx.lock().await;
        sqlx::query(
            "INSERT INTO users (id, email, name, tenant_id, status, password_hash) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id.as_uuid())
        .bind(user.email.trim().to_lowercase())
        .bind(&user.name)
        .bind(user.tenant_id.map(|t| *t.as_uuid()))
        .bind(user.status.as_str())
        .bind(&user.password_hash)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        for role_id in &user.role_ids {
            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
                .bind(user.id.as_uuid())
                .bind(role_id.as_uuid())
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("insert_user_role", e))?;
        }
        Ok(())
    }
}
