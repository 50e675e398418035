//! Per-tenant, per-application configuration.
//!
//! Settings come from two layers: the tenant's default settings and the
//! pairing's own settings. `merge` overlays the pairing on the tenant
//! defaults; `standalone` returns the pairing layer alone.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tenantgate_core::{
    DomainError, DomainResult, PairingWithApplication, Settings, Tenant, TenantId, merge_settings,
    settings_from_value,
};

use crate::store::IdentityStore;
use crate::views::{ApplicationSummary, TenantSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigMode {
    #[default]
    Merge,
    Standalone,
}

impl FromStr for ConfigMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(ConfigMode::Merge),
            "standalone" => Ok(ConfigMode::Standalone),
            other => Err(DomainError::bad_request(format!(
                "mode must be 'merge' or 'standalone', got '{other}'"
            ))),
        }
    }
}

impl ConfigMode {
    /// Absent mode means `merge`.
    pub fn parse_optional(raw: Option<&str>) -> DomainResult<Self> {
        match raw {
            None => Ok(ConfigMode::default()),
            Some(s) if s.trim().is_empty() => Ok(ConfigMode::default()),
            Some(s) => s.parse(),
        }
    }

    pub fn compute(&self, tenant_defaults: &Settings, pairing: &Settings) -> Settings {
        match self {
            ConfigMode::Merge => merge_settings(tenant_defaults, pairing),
            ConfigMode::Standalone => pairing.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantAppConfig {
    pub tenant: TenantSummary,
    pub application: ApplicationSummary,
    pub settings: Settings,
}

#[derive(Clone)]
pub struct ConfigResolver {
    store: Arc<dyn IdentityStore>,
}

impl ConfigResolver {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    pub async fn get_config(
        &self,
        app_code: &str,
        tenant_id: TenantId,
        mode: ConfigMode,
    ) -> DomainResult<TenantAppConfig> {
        let (tenant, pairing) = self.resolve(app_code, tenant_id).await?;
        Ok(TenantAppConfig {
            tenant: TenantSummary::from(&tenant),
            application: ApplicationSummary::from(&pairing.application),
            settings: mode.compute(&tenant.settings, &pairing.pairing.settings),
        })
    }

    /// Shallow-merge `patch` into the pairing settings, then return the fresh
    /// merged configuration.
    ///
    /// Patch keys win; keys absent from the patch are kept. There is no way to
    /// remove a key.
    pub async fn update_config(
        &self,
        app_code: &str,
        tenant_id: TenantId,
        patch: Value,
    ) -> DomainResult<TenantAppConfig> {
        let patch = settings_from_value(patch)?;
        let (_, pairing) = self.resolve(app_code, tenant_id).await?;

        let updated = self
            .store
            .merge_pairing_settings(tenant_id, pairing.application.id, &patch)
            .await?;
        if updated.is_none() {
            return Err(DomainError::not_found(format!(
                "application {} is not enabled for tenant {tenant_id}",
                pairing.application.code
            )));
        }

        tracing::info!(
            %tenant_id,
            app_code = %pairing.application.code,
            keys = patch.len(),
            "pairing settings updated"
        );

        self.get_config(app_code, tenant_id, ConfigMode::Merge).await
    }

    /// Tenant must exist and be active; the pairing must exist with both the
    /// pairing and its application active.
    async fn resolve(
        &self,
        app_code: &str,
        tenant_id: TenantId,
    ) -> DomainResult<(Tenant, PairingWithApplication)> {
        let app_code = require_app_code(Some(app_code))?;

        let tenant = self
            .store
            .find_tenant(tenant_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("tenant {tenant_id} not found")))?;
        if !tenant.status.is_active() {
            return Err(DomainError::not_found(format!("tenant {tenant_id} is not active")));
        }

        let pairing = self.store.find_pairing(tenant_id, app_code).await?.ok_or_else(|| {
            DomainError::not_found(format!(
                "application {app_code} is not enabled for tenant {tenant_id}"
            ))
        })?;
        if !pairing.application.status.is_active() {
            return Err(DomainError::not_found(format!("application {app_code} is not active")));
        }
        if !pairing.pairing.status.is_active() {
            return Err(DomainError::not_found(format!(
                "pairing for application {app_code} is not active"
            )));
        }

        Ok((tenant, pairing))
    }
}

/// The application code is mandatory on every configuration operation.
pub fn require_app_code(raw: Option<&str>) -> DomainResult<&str> {
    match raw.map(str::trim) {
        Some(code) if !code.is_empty() => Ok(code),
        _ => Err(DomainError::bad_request("app_code is required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Settings {
        settings_from_value(v).unwrap()
    }

    #[test]
    fn merge_overlays_pairing_on_tenant_defaults() {
        let settings = ConfigMode::Merge.compute(&obj(json!({"x": 0, "y": 2})), &obj(json!({"x": 1})));
        assert_eq!(Value::Object(settings), json!({"x": 1, "y": 2}));
    }

    #[test]
    fn standalone_ignores_tenant_defaults() {
        let settings = ConfigMode::Standalone.compute(&obj(json!({"x": 0, "y": 2})), &obj(json!({"x": 1})));
        assert_eq!(Value::Object(settings), json!({"x": 1}));
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(ConfigMode::parse_optional(None).unwrap(), ConfigMode::Merge);
        assert_eq!(ConfigMode::parse_optional(Some("")).unwrap(), ConfigMode::Merge);
        assert_eq!(ConfigMode::parse_optional(Some("STANDALONE")).unwrap(), ConfigMode::Standalone);
        let err = ConfigMode::parse_optional(Some("replace")).unwrap_err();
        assert_eq!(err.kind(), tenantgate_core::ErrorKind::BadRequest);
    }

    #[test]
    fn app_code_is_required() {
        assert_eq!(require_app_code(Some(" crm ")).unwrap(), "crm");
        for missing in [None, Some(""), Some("   ")] {
            let err = require_app_code(missing).unwrap_err();
            assert_eq!(err.kind(), tenantgate_core::ErrorKind::BadRequest);
        }
    }
}
