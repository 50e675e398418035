//! Which sub-applications a user can reach.

use std::collections::HashSet;
use std::sync::Arc;

use tenantgate_auth::app_access_codes;
use tenantgate_core::{DomainResult, SubApplication, Tenant, UserGraph, UserId};

use crate::store::IdentityStore;

/// Reachable = the tenant pairs with the app (pairing and app both active)
/// AND one of the user's roles carries `app:<code>:access`.
///
/// A user without a tenant reaches nothing. The result is sorted by code.
pub fn reachable_applications(graph: &UserGraph) -> Vec<SubApplication> {
    let Some(tenant) = graph.tenant.as_ref() else {
        return Vec::new();
    };

    let granted: HashSet<String> = app_access_codes(
        graph
            .roles
            .iter()
            .flat_map(|role| role.permissions.iter())
            .map(|perm| perm.code.as_str()),
    );
    if granted.is_empty() {
        return Vec::new();
    }

    let mut apps: Vec<SubApplication> = tenant
        .pairings
        .iter()
        .filter(|p| p.is_usable())
        .filter(|p| granted.contains(&p.application.code))
        .map(|p| p.application.clone())
        .collect();
    apps.sort_by(|a, b| a.code.cmp(&b.code));
    apps.dedup_by(|a, b| a.id == b.id);
    apps
}

#[derive(Clone)]
pub struct TenantResolver {
    store: Arc<dyn IdentityStore>,
}

impl TenantResolver {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Applications `user_id` can reach.
    ///
    /// An unknown user, or one without a tenant, yields an empty list rather
    /// than an error. Only store failures are errors.
    pub async fn accessible_applications(&self, user_id: UserId) -> DomainResult<Vec<SubApplication>> {
        let Some(graph) = self.store.load_user_graph(user_id).await? else {
            tracing::debug!(%user_id, "accessible applications requested for unknown user");
            return Ok(Vec::new());
        };
        Ok(reachable_applications(&graph))
    }

    /// Tenants whose status is active.
    pub async fn list_active_tenants(&self) -> DomainResult<Vec<Tenant>> {
        let mut tenants: Vec<Tenant> = self
            .store
            .list_tenants()
            .await?
            .into_iter()
            .filter(|t| t.status.is_active())
            .collect();
        tenants.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tenants)
    }
}
