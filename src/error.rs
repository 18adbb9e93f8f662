//! Error Types
//!
//! Probe failures and configuration errors.

use thiserror::Error;

/// Failure of a single probe execution.
///
/// The `Display` text becomes the outcome's `reason`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// DNS, TLS, connection or timeout failure
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// 401 without a usable `WWW-Authenticate` challenge
    #[error("{0}")]
    AuthChallenge(String),

    /// Token endpoint rejected the configured credentials
    #[error("failed to get auth token: authentication failed (status {status}) - check credentials")]
    Credentials { status: u16 },

    /// Token endpoint returned another non-200 or an unusable body
    #[error("failed to get auth token: {0}")]
    TokenRequest(String),

    /// Final manifest HEAD was not 200
    #[error("manifest check failed with status: {status}")]
    ManifestUnavailable { status: u16 },

    /// HTTP endpoint answered with something other than 200
    #[error("{0}")]
    UnexpectedStatus(String),

    /// git command failed
    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    /// Path missing from the fetched revision
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// HTTP client could not be built
    #[error("http client error: {0}")]
    Client(String),

    #[error("check cancelled")]
    Cancelled,
}

impl ProbeError {
    /// Closed taxonomy used when reason labels are classified
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Transport { .. } => "transport",
            ProbeError::AuthChallenge(_) => "auth_challenge",
            ProbeError::Credentials { .. } => "credentials",
            ProbeError::TokenRequest(_) => "token_request",
            ProbeError::ManifestUnavailable { .. } => "manifest_unavailable",
            ProbeError::UnexpectedStatus(_) => "unexpected_status",
            ProbeError::Git { .. } => "git",
            ProbeError::FileNotFound(_) => "file_not_found",
            ProbeError::Client(_) => "client",
            ProbeError::Cancelled => "cancelled",
        }
    }

    pub fn transport(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ProbeError::Transport {
            url: url.into(),
            message: err.to_string(),
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid client certificate for check {check}: {message}")]
    Tls { check: String, message: String },
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_message() {
        let err = ProbeError::ManifestUnavailable { status: 404 };
        assert_eq!(err.to_string(), "manifest check failed with status: 404");
        assert_eq!(err.kind(), "manifest_unavailable");
    }

    #[test]
    fn test_credentials_message() {
        let err = ProbeError::Credentials { status: 401 };
        assert!(err.to_string().contains("check credentials"));
    }
}
