//! Login and token verification.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenantgate_auth::{AuthError, CredentialIssuer, SecretComparator};
use tenantgate_core::{DomainError, DomainResult, UserGraph};

use crate::store::IdentityStore;
use crate::views::{RoleSummary, TenantSummary, UserSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedAuth {
    pub user: UserSummary,
    pub roles: Vec<RoleSummary>,
    /// Flattened, sorted permission codes resolved from live role records.
    pub permissions: Vec<String>,
    pub tenant: Option<TenantSummary>,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn IdentityStore>,
    issuer: CredentialIssuer,
    comparator: Arc<dyn SecretComparator>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        issuer: CredentialIssuer,
        comparator: Arc<dyn SecretComparator>,
    ) -> Self {
        Self {
            store,
            issuer,
            comparator,
        }
    }

    pub fn issuer(&self) -> &CredentialIssuer {
        &self.issuer
    }

    /// Unknown email, inactive user and wrong secret are indistinguishable to
    /// the caller.
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<LoginResponse> {
        let email = email.trim().to_lowercase();

        let user = self.store.find_user_by_email(&email).await?;

        // Every branch pays for one comparison, unknown emails included.
        let stored_hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.comparator.decoy_hash(),
        };
        let comparator = self.comparator.clone();
        let plaintext = password.to_string();
        let matched = tokio::task::spawn_blocking(move || comparator.compare(&plaintext, &stored_hash))
            .await
            .map_err(|e| DomainError::internal(format!("secret comparison aborted: {e}")))?;

        let Some(user) = user else {
            tracing::warn!(%email, "login rejected: unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };
        if !user.status.is_active() {
            tracing::warn!(user_id = %user.id, status = %user.status, "login rejected: user not active");
            return Err(AuthError::InvalidCredentials.into());
        }
        if !matched {
            tracing::warn!(user_id = %user.id, "login rejected: secret mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        let graph = self
            .store
            .load_user_graph(user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let issued = self.issuer.issue(&graph.user, &graph.roles, Utc::now())?;
        tracing::info!(user_id = %graph.user.id, tenant_id = ?graph.user.tenant_id, "login succeeded");

        Ok(LoginResponse {
            token: issued.token,
            user: UserSummary::new(&graph.user, &graph.roles),
        })
    }

    pub async fn verify_auth(&self, token: &str) -> DomainResult<VerifiedAuth> {
        self.verify_auth_at(token, Utc::now()).await
    }

    /// Verify `token` at `now`, then reload the user so roles and permissions
    /// reflect the current role records rather than the token snapshot.
    pub async fn verify_auth_at(&self, token: &str, now: DateTime<Utc>) -> DomainResult<VerifiedAuth> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingCredential.into());
        }
        let claims = self.issuer.codec().verify(token, now)?;

        let graph = self
            .store
            .load_user_graph(claims.id)
            .await?
            .ok_or_else(|| DomainError::unauthenticated("token subject no longer exists"))?;
        if !graph.user.status.is_active() {
            tracing::warn!(user_id = %graph.user.id, status = %graph.user.status, "verify rejected: user not active");
            return Err(DomainError::unauthenticated("token subject is not active"));
        }

        Ok(verified_from_graph(&graph))
    }
}

fn verified_from_graph(graph: &UserGraph) -> VerifiedAuth {
    let permissions: BTreeSet<String> = graph
        .roles
        .iter()
        .flat_map(|r| r.permissions.iter().map(|p| p.code.clone()))
        .collect();

    VerifiedAuth {
        user: UserSummary::new(&graph.user, &graph.roles),
        roles: graph.roles.iter().map(RoleSummary::from).collect(),
        permissions: permissions.into_iter().collect(),
        tenant: graph.tenant.as_ref().map(|t| TenantSummary::from(&t.tenant)),
    }
}
