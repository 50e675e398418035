use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Scope reserved for application-access gating (`app:<appcode>:access`).
pub const APP_SCOPE: &str = "app";
pub const ACCESS_ACTION: &str = "access";

/// Permission code, grammar `<scope>:<resource>:<action>`.
///
/// Each segment is non-empty and made of `[a-z0-9_-]`. Codes are compared as
/// exact strings; there is no wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode(Cow<'static, str>);

impl PermissionCode {
    /// Build a code from a literal known to be well-formed (catalog constants).
    pub const fn from_static(code: &'static str) -> Self {
        Self(Cow::Borrowed(code))
    }

    pub fn parse(code: &str) -> Result<Self, AuthError> {
        let code = code.trim();
        let segments: Vec<&str> = code.split(':').collect();
        if segments.len() != 3 {
            return Err(AuthError::InvalidPermissionCode(format!(
                "'{code}' must have exactly three ':'-separated segments"
            )));
        }
        for segment in &segments {
            if segment.is_empty() || !segment.chars().all(is_segment_char) {
                return Err(AuthError::InvalidPermissionCode(format!(
                    "'{code}' has an empty or malformed segment"
                )));
            }
        }
        Ok(Self(Cow::Owned(code.to_string())))
    }

    /// `app:<appcode>:access`.
    pub fn app_access(app_code: &str) -> Result<Self, AuthError> {
        Self::parse(&format!("{APP_SCOPE}:{app_code}:{ACCESS_ACTION}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scope(&self) -> &str {
        self.segment(0)
    }

    pub fn resource(&self) -> &str {
        self.segment(1)
    }

    pub fn action(&self) -> &str {
        self.segment(2)
    }

    /// The application code when this is an `app:<code>:access` code.
    pub fn access_app(&self) -> Option<&str> {
        (self.scope() == APP_SCOPE && self.action() == ACCESS_ACTION).then(|| self.resource())
    }

    fn segment(&self, idx: usize) -> &str {
        self.0.split(':').nth(idx).unwrap_or_default()
    }
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'
}

impl core::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for PermissionCode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = AuthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PermissionCode> for String {
    fn from(value: PermissionCode) -> Self {
        value.0.into_owned()
    }
}

/// Extract the application codes granted by `app:<code>:access` permissions.
///
/// Malformed codes and codes of any other shape are skipped.
pub fn app_access_codes<'a, I>(codes: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    codes
        .into_iter()
        .filter_map(|raw| PermissionCode::parse(raw).ok())
        .filter_map(|code| code.access_app().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_three_segments() {
        let code = PermissionCode::parse("system:user:read").unwrap();
        assert_eq!(code.scope(), "system");
        assert_eq!(code.resource(), "user");
        assert_eq!(code.action(), "read");
        assert_eq!(code.access_app(), None);
    }

    #[test]
    fn rejects_malformed_codes() {
        for bad in ["", "system", "system:user", "a:b:c:d", "a::c", "App:x:access", "a:b c:d"] {
            assert!(PermissionCode::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn app_access_round_trip() {
        let code = PermissionCode::app_access("einvoice").unwrap();
        assert_eq!(code.as_str(), "app:einvoice:access");
        assert_eq!(code.access_app(), Some("einvoice"));
    }

    #[test]
    fn only_access_action_in_app_scope_counts() {
        let codes = app_access_codes([
            "app:einvoice:access",
            "app:crm:configure",
            "system:app:access",
            "garbage",
            "app:hr:access",
        ]);
        let mut codes: Vec<_> = codes.into_iter().collect();
        codes.sort();
        assert_eq!(codes, vec!["einvoice".to_string(), "hr".to_string()]);
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: PermissionCode = serde_json::from_str("\"app:crm:access\"").unwrap();
        assert_eq!(ok.access_app(), Some("crm"));
        assert!(serde_json::from_str::<PermissionCode>("\"not-a-code\"").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any three well-formed segments parse back to the same parts.
        #[test]
        fn well_formed_codes_parse(
            scope in "[a-z][a-z0-9_-]{0,8}",
            resource in "[a-z0-9_-]{1,12}",
            action in "[a-z0-9_-]{1,8}",
        ) {
            let raw = format!("{scope}:{resource}:{action}");
            let code = PermissionCode::parse(&raw).unwrap();
            prop_assert_eq!(code.as_str(), raw.as_str());
            prop_assert_eq!(code.scope(), scope.as_str());
            prop_assert_eq!(code.resource(), resource.as_str());
            prop_assert_eq!(code.action(), action.as_str());
        }

        /// Property: anything with a segment count other than three is rejected.
        #[test]
        fn wrong_segment_count_rejected(parts in prop::collection::vec("[a-z]{1,4}", 1..6)) {
            prop_assume!(parts.len() != 3);
            prop_assert!(PermissionCode::parse(&parts.join(":")).is_err());
        }
    }
}
