//! Registry Client
//!
//! Manifest-existence checks against the distribution API (`/v2/...`).
//! Anonymous access is tried first; a 401 bearer challenge triggers one
//! token exchange and a single authenticated retry.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};

use super::challenge::AuthChallenge;
use super::reference::ImageReference;
use super::transport::{HttpTransport, TransportRequest, TransportResponse};
use crate::config::Credentials;
use crate::error::{ProbeError, ProbeResult};

pub const DEFAULT_TAG: &str = "latest";

/// Manifest media types offered in the `Accept` header
pub const MANIFEST_MEDIA_TYPES: [&str; 4] = [
    "application/vnd.docker.distribution.manifest.v2+json",
    "application/vnd.docker.distribution.manifest.list.v2+json",
    "application/vnd.oci.image.manifest.v1+json",
    "application/vnd.oci.image.index.v1+json",
];

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> Option<String> {
        self.token
            .filter(|t| !t.is_empty())
            .or(self.access_token)
            .filter(|t| !t.is_empty())
    }
}

/// Distribution API client for one set of credentials
#[derive(Clone)]
pub struct RegistryClient {
    transport: Arc<dyn HttpTransport>,
    credentials: Option<Credentials>,
    accept: String,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("authenticated", &self.credentials.is_some())
            .finish()
    }
}

impl RegistryClient {
    /// Basic auth is only sent when the credentials are complete
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Option<Credentials>) -> Self {
        Self {
            transport,
            credentials: credentials.filter(Credentials::is_complete),
            accept: MANIFEST_MEDIA_TYPES.join(", "),
        }
    }

    /// Check every tag in order, stopping at the first failure
    pub async fn check_all_tags(&self, image: &ImageReference, tags: &[String]) -> ProbeResult<()> {
        for tag in tags {
            if let Err(e) = self.check_tag(image, tag).await {
                error!(image = %image, tag = %tag, error = %e, "manifest check failed");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Check that one tag's manifest exists. An empty tag means `latest`.
    pub async fn check_tag(&self, image: &ImageReference, tag: &str) -> ProbeResult<()> {
        let tag = if tag.is_empty() { DEFAULT_TAG } else { tag };
        let url = image.manifest_url(tag);

        let mut response = self.head_manifest(&url, None).await?;

        if response.status == 401 {
            let header = response.www_authenticate.as_deref().ok_or_else(|| {
                ProbeError::AuthChallenge("unauthorized and no WWW-Authenticate header".to_string())
            })?;
            let challenge = AuthChallenge::parse(header).map_err(|e| match e {
                ProbeError::AuthChallenge(msg) => {
                    ProbeError::AuthChallenge(format!("failed to get auth token: {}", msg))
                }
                other => other,
            })?;
            debug!(image = %image, tag, realm = %challenge.realm, "registry requested a token");

            let token = self.fetch_token(image, &challenge).await?;
            response = self.head_manifest(&url, Some(&token)).await?;
        }

        if response.status != 200 {
            return Err(ProbeError::ManifestUnavailable {
                status: response.status,
            });
        }

        debug!(image = %image, tag, "manifest present");
        Ok(())
    }

    /// Exchange the challenge for a pull-scoped bearer token
    pub async fn fetch_token(
        &self,
        image: &ImageReference,
        challenge: &AuthChallenge,
    ) -> ProbeResult<String> {
        let mut request =
            TransportRequest::get(challenge.token_url(&image.repository)).capture_body();
        if let Some(creds) = &self.credentials {
            request = request.with_basic_auth(&creds.username, &creds.password);
        }

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ProbeError::TokenRequest(e.to_string()))?;
        match response.status {
            200 => {}
            401 => return Err(ProbeError::Credentials { status: 401 }),
            status => {
                return Err(ProbeError::TokenRequest(format!(
                    "token request failed with status: {}",
                    status
                )))
            }
        }

        let body: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| ProbeError::TokenRequest(format!("malformed token response: {}", e)))?;

        body.into_token().ok_or_else(|| {
            ProbeError::TokenRequest("token response did not contain a token".to_string())
        })
    }

    async fn head_manifest(&self, url: &str, token: Option<&str>) -> ProbeResult<TransportResponse> {
        let mut request = TransportRequest::head(url).with_header("Accept", self.accept.as_str());
        if let Some(token) = token {
            request = request.with_header("Authorization", format!("Bearer {}", token));
        }
        self.transport.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::transport::Method;
    use crate::test_support::ScriptedTransport;

    const CHALLENGE: &str = r#"Bearer realm="https://quay.io/v2/auth",service="quay.io""#;

    fn client(transport: &Arc<ScriptedTransport>, creds: Option<Credentials>) -> RegistryClient {
        RegistryClient::new(transport.clone(), creds)
    }

    fn image() -> ImageReference {
        ImageReference::parse("quay.io/foo/bar")
    }

    fn tags(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_anonymous_success_skips_token() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::new(200))]);
        client(&transport, None).check_tag(&image(), "v1").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Head);
        assert_eq!(requests[0].url, "https://quay.io/v2/foo/bar/manifests/v1");
        assert_eq!(
            requests[0].header("Accept"),
            Some(MANIFEST_MEDIA_TYPES.join(", ").as_str())
        );
        assert_eq!(requests[0].header("Authorization"), None);
        assert_eq!(transport.count(Method::Get), 0);
    }

    #[tokio::test]
    async fn test_empty_tag_checks_latest_once() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::new(200))]);
        client(&transport, None)
            .check_all_tags(&image(), &tags(&[""]))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://quay.io/v2/foo/bar/manifests/latest");
    }

    #[tokio::test]
    async fn test_challenge_then_token_then_retry() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::new(200)),
            Ok(TransportResponse::new(401).with_challenge(CHALLENGE)),
            Ok(TransportResponse::new(200).with_body(r#"{"token":"abc"}"#)),
            Ok(TransportResponse::new(200)),
        ]);
        client(&transport, None)
            .check_all_tags(&image(), &tags(&["v1", "v2"]))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(
            requests[2].url,
            "https://quay.io/v2/auth?service=quay.io&scope=repository:foo/bar:pull"
        );
        assert_eq!(requests[2].basic_auth, None);
        assert!(requests[2].capture_body);
        assert!(!requests[0].capture_body);
        assert_eq!(requests[3].url, "https://quay.io/v2/foo/bar/manifests/v2");
        assert_eq!(requests[3].header("Authorization"), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn test_first_failing_tag_short_circuits() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::new(404))]);
        let err = client(&transport, None)
            .check_all_tags(&image(), &tags(&["v1", "v2"]))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "manifest check failed with status: 404");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_realm_makes_no_token_request() {
        let transport = ScriptedTransport::new(vec![Ok(
            TransportResponse::new(401).with_challenge(r#"Bearer service="quay.io""#)
        )]);
        let err = client(&transport, None).check_tag(&image(), "v1").await.unwrap_err();

        assert_eq!(err.kind(), "auth_challenge");
        assert!(err
            .to_string()
            .starts_with("failed to get auth token: failed to parse auth realm from:"));
        assert_eq!(transport.count(Method::Get), 0);
    }

    #[tokio::test]
    async fn test_missing_challenge_header() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::new(401))]);
        let err = client(&transport, None).check_tag(&image(), "v1").await.unwrap_err();

        assert_eq!(err.kind(), "auth_challenge");
        assert_eq!(transport.count(Method::Get), 0);
    }

    #[tokio::test]
    async fn test_token_unauthorized_is_credentials_error() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::new(401).with_challenge(CHALLENGE)),
            Ok(TransportResponse::new(401)),
        ]);
        let creds = Credentials::new("robot", "secret");
        let err = client(&transport, Some(creds)).check_tag(&image(), "v1").await.unwrap_err();

        assert_eq!(err, ProbeError::Credentials { status: 401 });
        let requests = transport.requests();
        assert_eq!(
            requests[1].basic_auth,
            Some(("robot".to_string(), "secret".to_string()))
        );
    }

    #[tokio::test]
    async fn test_token_server_error() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::new(401).with_challenge(CHALLENGE)),
            Ok(TransportResponse::new(503)),
        ]);
        let err = client(&transport, None).check_tag(&image(), "v1").await.unwrap_err();

        assert_eq!(err.kind(), "token_request");
        assert!(err.to_string().contains("token request failed with status: 503"));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_access_token_fallback_and_precedence() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::new(200).with_body(r#"{"access_token":"xyz"}"#)),
            Ok(TransportResponse::new(200).with_body(r#"{"token":"a","access_token":"b"}"#)),
            Ok(TransportResponse::new(200).with_body(r#"{"token":"","access_token":"c"}"#)),
        ]);
        let client = client(&transport, None);
        let challenge = AuthChallenge::parse(CHALLENGE).unwrap();

        assert_eq!(client.fetch_token(&image(), &challenge).await.unwrap(), "xyz");
        assert_eq!(client.fetch_token(&image(), &challenge).await.unwrap(), "a");
        assert_eq!(client.fetch_token(&image(), &challenge).await.unwrap(), "c");
    }

    #[tokio::test]
    async fn test_malformed_and_empty_token_bodies() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::new(200).with_body("not json")),
            Ok(TransportResponse::new(200).with_body("{}")),
        ]);
        let client = client(&transport, None);
        let challenge = AuthChallenge::parse(CHALLENGE).unwrap();

        let malformed = client.fetch_token(&image(), &challenge).await.unwrap_err();
        assert_eq!(malformed.kind(), "token_request");
        let empty = client.fetch_token(&image(), &challenge).await.unwrap_err();
        assert!(empty.to_string().contains("did not contain a token"));
    }

    #[tokio::test]
    async fn test_retry_failure_reports_final_status() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::new(401).with_challenge(CHALLENGE)),
            Ok(TransportResponse::new(200).with_body(r#"{"token":"abc"}"#)),
            Ok(TransportResponse::new(403)),
        ]);
        let err = client(&transport, None).check_tag(&image(), "v1").await.unwrap_err();

        assert_eq!(err, ProbeError::ManifestUnavailable { status: 403 });
    }

    #[tokio::test]
    async fn test_incomplete_credentials_are_not_sent() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::new(401).with_challenge(CHALLENGE)),
            Ok(TransportResponse::new(200).with_body(r#"{"token":"abc"}"#)),
            Ok(TransportResponse::new(200)),
        ]);
        let creds = Credentials::new("robot", "");
        client(&transport, Some(creds)).check_tag(&image(), "v1").await.unwrap();

        assert_eq!(transport.requests()[1].basic_auth, None);
    }

    #[tokio::test]
    async fn test_token_refetched_per_tag() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::new(401).with_challenge(CHALLENGE)),
            Ok(TransportResponse::new(200).with_body(r#"{"token":"a"}"#)),
            Ok(TransportResponse::new(200)),
            Ok(TransportResponse::new(401).with_challenge(CHALLENGE)),
            Ok(TransportResponse::new(200).with_body(r#"{"token":"b"}"#)),
            Ok(TransportResponse::new(200)),
        ]);
        client(&transport, None)
            .check_all_tags(&image(), &tags(&["v1", "v2"]))
            .await
            .unwrap();

        assert_eq!(transport.count(Method::Get), 2);
        let retries: Vec<_> = transport
            .requests()
            .into_iter()
            .filter(|r| r.method == Method::Head && r.header("Authorization").is_some())
            .collect();
        assert_eq!(retries.len(), 2);
        assert!(retries[0].url.ends_with("/manifests/v1"));
        assert_eq!(retries[0].header("Authorization"), Some("Bearer a"));
        assert!(retries[1].url.ends_with("/manifests/v2"));
        assert_eq!(retries[1].header("Authorization"), Some("Bearer b"));
    }

    #[tokio::test]
    async fn test_token_transport_error_is_token_request() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::new(401).with_challenge(CHALLENGE)),
            Err(ProbeError::transport("https://quay.io/v2/auth", "connection reset")),
        ]);
        let err = client(&transport, None).check_tag(&image(), "v1").await.unwrap_err();

        assert_eq!(err.kind(), "token_request");
        assert_eq!(
            err.to_string(),
            "failed to get auth token: request to https://quay.io/v2/auth failed: connection reset"
        );
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let transport = ScriptedTransport::new(vec![Err(ProbeError::transport(
            "https://quay.io/v2/foo/bar/manifests/v1",
            "connection refused",
        ))]);
        let err = client(&transport, None).check_tag(&image(), "v1").await.unwrap_err();

        assert_eq!(err.kind(), "transport");
    }
}
