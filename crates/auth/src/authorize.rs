use std::collections::BTreeSet;

use thiserror::Error;

use tenantgate_core::DomainError;

use crate::claims::RoleClaim;
use crate::permissions::PermissionCode;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("missing permission(s): {}", .0.join(", "))]
    MissingPermissions(Vec<String>),
}

impl From<AuthzError> for DomainError {
    fn from(err: AuthzError) -> Self {
        DomainError::forbidden(err.to_string())
    }
}

/// Union of every permission code carried by `roles`.
pub fn flatten_permissions<'a, I>(roles: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a RoleClaim>,
{
    roles
        .into_iter()
        .flat_map(|role| role.permissions.iter().cloned())
        .collect()
}

/// Require `granted` to contain **every** code in `required`.
///
/// - No IO
/// - No panics
/// - An empty `required` list always passes
pub fn authorize_all(granted: &BTreeSet<String>, required: &[PermissionCode]) -> Result<(), AuthzError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|code| !granted.contains(code.as_str()))
        .map(|code| code.as_str().to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthzError::MissingPermissions(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenantgate_core::RoleId;

    fn role(perms: &[&str]) -> RoleClaim {
        RoleClaim {
            id: RoleId::new(),
            name: "r".to_string(),
            permissions: perms.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn codes(raw: &[&'static str]) -> Vec<PermissionCode> {
        raw.iter().map(|c| PermissionCode::from_static(c)).collect()
    }

    #[test]
    fn flattening_unions_roles() {
        let granted = flatten_permissions(&[
            role(&["system:user:read", "app:crm:access"]),
            role(&["app:crm:access", "system:role:read"]),
        ]);
        assert_eq!(granted.len(), 3);
    }

    #[test]
    fn all_required_codes_must_be_present() {
        let granted = flatten_permissions(&[role(&["system:user:read"]), role(&["system:role:read"])]);

        assert!(authorize_all(&granted, &codes(&["system:user:read", "system:role:read"])).is_ok());

        let err = authorize_all(&granted, &codes(&["system:user:read", "system:user:delete"])).unwrap_err();
        assert_eq!(err, AuthzError::MissingPermissions(vec!["system:user:delete".to_string()]));
    }

    #[test]
    fn nothing_required_always_passes() {
        assert!(authorize_all(&BTreeSet::new(), &[]).is_ok());
    }

    #[test]
    fn forbidden_kind_on_conversion() {
        let err: DomainError = AuthzError::MissingPermissions(vec!["a:b:c".into()]).into();
        assert_eq!(err.kind(), tenantgate_core::ErrorKind::Forbidden);
    }
}
