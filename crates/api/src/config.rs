//! Process configuration read from the environment.

use std::net::SocketAddr;

use thiserror::Error;

use tenantgate_infra::SeedConfig;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid BIND_ADDR '{value}': {reason}")]
    BindAddr { value: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub seed: SeedConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").filter(|s| !s.is_empty()).unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let raw_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::BindAddr {
            value: raw_addr.clone(),
            reason: e.to_string(),
        })?;

        let use_persistent_stores = lookup("USE_PERSISTENT_STORES")
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(false);

        let mut seed = SeedConfig::default();
        if let Some(email) = lookup("SEED_ADMIN_EMAIL") {
            seed.admin_email = email;
        }
        if let Some(password) = lookup("SEED_ADMIN_PASSWORD") {
            seed.admin_password = password;
        }

        Ok(Self {
            jwt_secret,
            bind_addr,
            use_persistent_stores,
            database_url: lookup("DATABASE_URL"),
            seed,
        })
    }
}
