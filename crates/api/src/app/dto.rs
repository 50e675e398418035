//! Request DTOs.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModeQuery {
    pub mode: Option<String>,
}

/// Query string of the `/tenants/:tenant_id/config` variant.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigQuery {
    pub app_code: Option<String>,
    pub mode: Option<String>,
}
