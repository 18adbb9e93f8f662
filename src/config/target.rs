//! Probe Targets
//!
//! Immutable per-check configuration, one struct per probe kind.

use serde::Deserialize;

use crate::registry::DEFAULT_TAG;

/// Username and password pair
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Both fields are non-empty
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// File existence check in a git repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GitTarget {
    pub name: String,
    pub url: String,
    /// Ref to fetch, e.g. `refs/heads/main`
    pub revision: String,
    /// File that must exist at that ref
    pub path: String,
    pub token: String,
}

/// Manifest existence check for an image's tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryTarget {
    pub name: String,
    #[serde(rename = "pullspec", alias = "image")]
    pub image: String,
    pub tags: Vec<String>,
    pub username: String,
    pub password: String,
}

impl RegistryTarget {
    pub fn credentials(&self) -> Option<Credentials> {
        let creds = Credentials::new(&self.username, &self.password);
        creds.is_complete().then_some(creds)
    }

    pub(crate) fn normalize(&mut self) {
        if self.tags.is_empty() {
            self.tags.push(DEFAULT_TAG.to_string());
        }
    }
}

/// Plain HTTP(S) GET check
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpTarget {
    pub name: String,
    pub url: String,
    pub username: String,
    pub password: String,
    /// PEM client certificate
    pub cert: String,
    /// PEM private key for `cert`
    pub key: String,
    /// Skip TLS verification
    pub insecure: bool,
    #[serde(rename = "follow_redirect")]
    pub follow: bool,
}

impl HttpTarget {
    pub fn credentials(&self) -> Option<Credentials> {
        let creds = Credentials::new(&self.username, &self.password);
        creds.is_complete().then_some(creds)
    }

    /// Certificate and key concatenated, when both are set
    pub fn identity_pem(&self) -> Option<Vec<u8>> {
        if self.cert.is_empty() || self.key.is_empty() {
            return None;
        }
        let mut pem = self.cert.trim_end().as_bytes().to_vec();
        pem.push(b'\n');
        pem.extend_from_slice(self.key.as_bytes());
        Some(pem)
    }
}
