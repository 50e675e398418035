//! Per-route access metadata.
//!
//! Each route declares a `RouteAccess` record; a router group (controller)
//! can declare defaults the same way. `RouteAccess::resolve` combines the
//! two, field by field, preferring the handler-level declaration.

use tenantgate_auth::PermissionCode;

/// Declared access requirements. `None` means "not declared at this level".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteAccess {
    login_required: Option<bool>,
    permissions: Option<Vec<PermissionCode>>,
}

impl RouteAccess {
    /// Nothing declared; resolves to "login required, no permissions".
    pub fn inherit() -> Self {
        Self::default()
    }

    /// Explicitly disables the login requirement.
    pub fn public() -> Self {
        Self {
            login_required: Some(false),
            permissions: None,
        }
    }

    pub fn login() -> Self {
        Self {
            login_required: Some(true),
            permissions: None,
        }
    }

    /// Login plus every listed permission code.
    pub fn require<I>(codes: I) -> Self
    where
        I: IntoIterator<Item = PermissionCode>,
    {
        Self::login().with_permissions(codes)
    }

    pub fn with_permissions<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = PermissionCode>,
    {
        self.permissions = Some(codes.into_iter().collect());
        self
    }

    pub fn with_login_required(mut self, required: bool) -> Self {
        self.login_required = Some(required);
        self
    }

    pub fn resolve(controller: &RouteAccess, handler: &RouteAccess) -> ResolvedAccess {
        let login_required = handler
            .login_required
            .or(controller.login_required)
            .unwrap_or(true);
        let required = handler
            .permissions
            .as_ref()
            .or(controller.permissions.as_ref())
            .cloned()
            .unwrap_or_default();
        ResolvedAccess {
            login_required,
            required,
        }
    }
}

/// What the guard chain actually enforces for one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccess {
    pub login_required: bool,
    pub required: Vec<PermissionCode>,
}

impl Default for ResolvedAccess {
    fn default() -> Self {
        RouteAccess::resolve(&RouteAccess::inherit(), &RouteAccess::inherit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenantgate_auth::catalog::system;

    #[test]
    fn login_is_required_unless_disabled() {
        let resolved = ResolvedAccess::default();
        assert!(resolved.login_required);
        assert!(resolved.required.is_empty());

        let public = RouteAccess::resolve(&RouteAccess::inherit(), &RouteAccess::public());
        assert!(!public.login_required);
    }

    #[test]
    fn handler_declaration_overrides_controller() {
        let controller = RouteAccess::require([system::TENANT_READ]);
        let handler = RouteAccess::inherit().with_permissions([system::USER_READ]);
        let resolved = RouteAccess::resolve(&controller, &handler);
        assert!(resolved.login_required);
        assert_eq!(resolved.required, vec![system::USER_READ]);
    }

    #[test]
    fn undeclared_fields_fall_back_to_controller() {
        let controller = RouteAccess::public().with_permissions([system::APP_READ]);
        let resolved = RouteAccess::resolve(&controller, &RouteAccess::inherit());
        assert!(!resolved.login_required);
        assert_eq!(resolved.required, vec![system::APP_READ]);
    }

    #[test]
    fn handler_can_clear_controller_permissions() {
        let controller = RouteAccess::require([system::USER_READ]);
        let handler = RouteAccess::inherit().with_permissions(Vec::<PermissionCode>::new());
        assert!(RouteAccess::resolve(&controller, &handler).required.is_empty());
    }
}
