//! Bearer Challenge Parsing
//!
//! Extracts `realm` and `service` from a `WWW-Authenticate` header, e.g.
//! `Bearer realm="https://quay.io/v2/auth",service="quay.io",scope="repository:user/repo:pull"`.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ProbeError;

static REALM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"realm="([^"]+)""#).expect("static regex"));
static SERVICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"service="([^"]+)""#).expect("static regex"));

/// Parsed authentication challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub realm: String,
    pub service: Option<String>,
}

impl AuthChallenge {
    pub fn parse(header: &str) -> Result<Self, ProbeError> {
        let realm = REALM_RE
            .captures(header)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                ProbeError::AuthChallenge(format!("failed to parse auth realm from: {}", header))
            })?;

        let service = SERVICE_RE
            .captures(header)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        Ok(Self { realm, service })
    }

    /// Token endpoint URL for pull access to `repository`
    pub fn token_url(&self, repository: &str) -> String {
        let sep = if self.realm.contains('?') { '&' } else { '?' };
        format!(
            "{}{}service={}&scope=repository:{}:pull",
            self.realm,
            sep,
            self.service.as_deref().unwrap_or(""),
            repository
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_challenge() {
        let c = AuthChallenge::parse(
            r#"Bearer realm="https://quay.io/v2/auth",service="quay.io",scope="repository:user/repo:pull""#,
        )
        .unwrap();
        assert_eq!(c.realm, "https://quay.io/v2/auth");
        assert_eq!(c.service.as_deref(), Some("quay.io"));
    }

    #[test]
    fn test_service_is_optional() {
        let c = AuthChallenge::parse(r#"Bearer realm="https://auth.example.com/token""#).unwrap();
        assert_eq!(c.service, None);
        assert_eq!(
            c.token_url("foo/bar"),
            "https://auth.example.com/token?service=&scope=repository:foo/bar:pull"
        );
    }

    #[test]
    fn test_missing_realm() {
        let err = AuthChallenge::parse(r#"Bearer service="quay.io""#).unwrap_err();
        assert_eq!(err.kind(), "auth_challenge");
        assert!(err.to_string().contains("failed to parse auth realm"));
    }

    #[test]
    fn test_token_url() {
        let c = AuthChallenge {
            realm: "https://quay.io/v2/auth".into(),
            service: Some("quay.io".into()),
        };
        assert_eq!(
            c.token_url("foo/bar"),
            "https://quay.io/v2/auth?service=quay.io&scope=repository:foo/bar:pull"
        );
    }
}
