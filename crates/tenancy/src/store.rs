//! Identity store contract.
//!
//! The persistence engine is a collaborator: this crate only needs CRUD-ish
//! reads, the two eager-loaded graphs, and one atomic settings merge.

use async_trait::async_trait;
use thiserror::Error;

use tenantgate_core::{
    ApplicationId, DomainError, Pairing, PairingWithApplication, Settings, Tenant, TenantId, User,
    UserGraph, UserId,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "identity store failure");
        DomainError::internal("storage unavailable")
    }
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look a user up by normalized (trimmed, lowercase) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// User → Role → Permission and User → Tenant → Pairing → SubApplication.
    ///
    /// Returns `None` only when the user itself is absent; missing relations
    /// are empty/`None` inside the graph.
    async fn load_user_graph(&self, user_id: UserId) -> Result<Option<UserGraph>, StoreError>;

    /// All tenants, any status.
    async fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError>;

    async fn find_tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, StoreError>;

    /// The pairing between `tenant_id` and the application coded `app_code`,
    /// with the application loaded. Status is not filtered.
    async fn find_pairing(
        &self,
        tenant_id: TenantId,
        app_code: &str,
    ) -> Result<Option<PairingWithApplication>, StoreError>;

    /// Shallow-merge `patch` into the pairing's settings as one atomic
    /// read-merge-persist unit and return the updated row (`None` if the
    /// pairing does not exist).
    async fn merge_pairing_settings(
        &self,
        tenant_id: TenantId,
        application_id: ApplicationId,
        patch: &Settings,
    ) -> Result<Option<Pairing>, StoreError>;
}
