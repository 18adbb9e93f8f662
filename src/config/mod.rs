//! Configuration
//!
//! YAML file loading with a per-check environment overlay.

mod service;
mod target;

pub use service::ServiceConfig;
pub use target::{Credentials, GitTarget, HttpTarget, RegistryTarget};

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;

/// Configured checks grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    pub git: Vec<GitTarget>,
    #[serde(alias = "registry")]
    pub quay: Vec<RegistryTarget>,
    pub http: Vec<HttpTarget>,
}

impl ChecksConfig {
    pub fn len(&self) -> usize {
        self.git.len() + self.quay.len() + self.http.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub checks: ChecksConfig,
}

fn overlay(slot: &mut String, lookup: &impl Fn(&str) -> Option<String>, key: String) {
    if let Some(value) = lookup(&key).filter(|v| !v.is_empty()) {
        *slot = value;
    }
}

impl Config {
    /// Read, overlay the process environment and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw, |key| std::env::var(key).ok())
    }

    /// Parse YAML, overlay values from `lookup` and validate
    pub fn from_yaml(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(raw)?;
        config.apply_env(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Non-empty `{NAME}_{KIND}_{FIELD}` variables override file values
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for git in &mut self.checks.git {
            let name = git.name.to_uppercase();
            overlay(&mut git.token, &lookup, format!("{}_GIT_TOKEN", name));
        }

        for quay in &mut self.checks.quay {
            let name = quay.name.to_uppercase();
            overlay(&mut quay.username, &lookup, format!("{}_QUAY_USERNAME", name));
            overlay(&mut quay.password, &lookup, format!("{}_QUAY_PASSWORD", name));
        }

        for http in &mut self.checks.http {
            let name = http.name.to_uppercase();
            overlay(&mut http.username, &lookup, format!("{}_HTTP_USERNAME", name));
            overlay(&mut http.password, &lookup, format!("{}_HTTP_PASSWORD", name));
            overlay(&mut http.cert, &lookup, format!("{}_HTTP_CERT", name));
            overlay(&mut http.key, &lookup, format!("{}_HTTP_KEY", name));
        }
    }

    /// Fill defaults and reject unusable checks
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.service.normalize();

        let mut seen = HashSet::new();
        let mut claim = |kind: &str, name: &str| -> Result<(), ConfigError> {
            if name.is_empty() {
                return Err(ConfigError::Invalid(format!("{} check without a name", kind)));
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::Invalid(format!("duplicate check name: {}", name)));
            }
            Ok(())
        };

        for git in &self.checks.git {
            claim("git", &git.name)?;
            if git.url.is_empty() || git.path.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "git check {} needs url and path",
                    git.name
                )));
            }
        }

        for quay in &mut self.checks.quay {
            claim("quay", &quay.name)?;
            if quay.image.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "quay check {} needs a pullspec",
                    quay.name
                )));
            }
            quay.normalize();
        }

        for http in &self.checks.http {
            claim("http", &http.name)?;
            if http.url.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "http check {} needs a url",
                    http.name
                )));
            }
        }

        Ok(())
    }
}
