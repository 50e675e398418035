//! Service wiring: identity store backend, token codec, and the use-case
//! services the handlers call.

use std::sync::Arc;

use thiserror::Error;

use tenantgate_auth::{BcryptComparator, CredentialIssuer, Hs256TokenCodec, SecretComparator, TokenCodec};
use tenantgate_infra::{SeedError, seed_in_memory};
use tenantgate_tenancy::{AuthService, ConfigResolver, IdentityStore, StoreError, TenantResolver};

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("seeding failed: {0}")]
    Seed(#[from] SeedError),

    #[error("identity store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,
}

#[derive(Clone)]
pub struct AppServices {
    pub auth: AuthService,
    pub tenants: TenantResolver,
    pub config: ConfigResolver,
    pub codec: Arc<dyn TokenCodec>,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        codec: Arc<dyn TokenCodec>,
        comparator: Arc<dyn SecretComparator>,
    ) -> Self {
        let issuer = CredentialIssuer::new(codec.clone());
        Self {
            auth: AuthService::new(store.clone(), issuer, comparator),
            tenants: TenantResolver::new(store.clone()),
            config: ConfigResolver::new(store),
            codec,
        }
    }
}

pub async fn build_services(config: &ApiConfig) -> Result<AppServices, ServicesError> {
    let codec: Arc<dyn TokenCodec> = Arc::new(Hs256TokenCodec::new(config.jwt_secret.as_bytes()));
    let hasher = BcryptComparator::default();

    if config.use_persistent_stores {
        #[cfg(feature = "postgres")]
        {
            let store = build_persistent_store(config, &hasher).await?;
            return Ok(AppServices::new(store, codec, Arc::new(hasher)));
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but the `postgres` feature is disabled; using in-memory store"
            );
        }
    }

    let (store, report) = seed_in_memory(&hasher, &config.seed).await?;
    tracing::info!(
        tenant_id = %report.tenant_id,
        admin_email = %config.seed.admin_email,
        "using seeded in-memory identity store"
    );
    Ok(AppServices::new(Arc::new(store), codec, Arc::new(hasher)))
}

#[cfg(feature = "postgres")]
async fn build_persistent_store(
    config: &ApiConfig,
    hasher: &BcryptComparator,
) -> Result<Arc<dyn IdentityStore>, ServicesError> {
    use tenantgate_infra::PostgresIdentityStore;

    let database_url = config
        .database_url
        .as_deref()
        .ok_or(ServicesError::MissingDatabaseUrl)?;
    let store = PostgresIdentityStore::connect(database_url).await?;
    store.ensure_schema().await?;
    store.seed(hasher, &config.seed).await?;
    tracing::info!("using Postgres identity store");
    Ok(Arc::new(store))
}
