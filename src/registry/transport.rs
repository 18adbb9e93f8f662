//! HTTP Transport
//!
//! The seam between protocol logic and the network. Probes talk to a
//! [`HttpTransport`]; production code uses [`ReqwestTransport`].

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::WWW_AUTHENTICATE;
use reqwest::{redirect, Identity, StatusCode};
use std::time::Duration;

use crate::error::ProbeError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest body [`ReqwestTransport`] buffers for a request that captures it
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Head,
    Get,
}

/// Outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<(String, String)>,
    /// Buffer the response body. Off by default; status-only callers skip the download.
    pub capture_body: bool,
}

impl TransportRequest {
    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::Head, url)
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            basic_auth: None,
            capture_body: false,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.basic_auth = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn capture_body(mut self) -> Self {
        self.capture_body = true;
        self
    }

    /// Value of a header set on this request
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response metadata the probes care about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub www_authenticate: Option<String>,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_challenge(mut self, header: &str) -> Self {
        self.www_authenticate = Some(header.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Status code plus reason phrase, e.g. `404 Not Found`
    pub fn status_line(&self) -> String {
        match StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
        {
            Some(reason) => format!("{} {}", self.status, reason),
            None => self.status.to_string(),
        }
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ProbeError>;
}

/// reqwest client settings
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    /// Skip TLS certificate verification
    pub insecure: bool,
    pub follow_redirects: bool,
    /// PEM certificate chain followed by its private key
    pub identity_pem: Option<Vec<u8>>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            insecure: false,
            follow_redirects: true,
            identity_pem: None,
        }
    }
}

impl ClientOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`HttpTransport`] over a `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(options: &ClientOptions) -> Result<Self, ProbeError> {
        let policy = if options.follow_redirects {
            redirect::Policy::default()
        } else {
            redirect::Policy::none()
        };

        let mut builder = reqwest::Client::builder()
            .timeout(options.timeout)
            .redirect(policy)
            .danger_accept_invalid_certs(options.insecure);

        if let Some(pem) = &options.identity_pem {
            let identity = Identity::from_pem(pem).map_err(|e| ProbeError::Client(e.to_string()))?;
            builder = builder.identity(identity);
        }

        let client = builder
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ProbeError> {
        let mut builder = match request.method {
            Method::Head => self.client.head(&request.url),
            Method::Get => self.client.get(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProbeError::transport(&request.url, e))?;

        let status = response.status().as_u16();
        let www_authenticate = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match request.method {
            Method::Get if request.capture_body => read_body(response, &request.url).await?,
            _ => Bytes::new(),
        };

        Ok(TransportResponse {
            status,
            www_authenticate,
            body,
        })
    }
}

async fn read_body(mut response: reqwest::Response, url: &str) -> Result<Bytes, ProbeError> {
    let too_large = || {
        ProbeError::transport(url, format!("response body exceeds {} bytes", MAX_BODY_BYTES))
    };

    if response
        .content_length()
        .is_some_and(|len| len > MAX_BODY_BYTES as u64)
    {
        return Err(too_large());
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ProbeError::transport(url, e))?
    {
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}
