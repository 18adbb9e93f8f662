//! HTTP Probe
//!
//! GETs a URL and expects a 200.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{record_check, Probe};
use crate::config::{Credentials, HttpTarget};
use crate::error::{ProbeError, ProbeResult};
use crate::observability::MetricSink;
use crate::outcome::Outcome;
use crate::registry::{HttpTransport, TransportRequest};

pub struct HttpProbe {
    name: String,
    url: String,
    credentials: Option<Credentials>,
    transport: Arc<dyn HttpTransport>,
    sink: MetricSink,
}

impl HttpProbe {
    /// `transport` carries the target's TLS and redirect settings
    pub fn new(target: &HttpTarget, transport: Arc<dyn HttpTransport>, sink: MetricSink) -> Self {
        Self {
            name: target.name.clone(),
            url: target.url.clone(),
            credentials: target.credentials(),
            transport,
            sink,
        }
    }

    async fn check(&self) -> ProbeResult<()> {
        let mut request = TransportRequest::get(&self.url);
        if let Some(creds) = &self.credentials {
            request = request.with_basic_auth(&creds.username, &creds.password);
        }

        let response = self.transport.send(request).await?;
        if response.status != 200 {
            return Err(ProbeError::UnexpectedStatus(response.status_line()));
        }
        Ok(())
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "http"
    }

    async fn execute(&self, cancel: &CancellationToken) -> Outcome {
        record_check(&self.name, self.kind(), &self.sink, cancel, self.check()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{MetricsRegistry, ReasonLabels};
    use crate::registry::TransportResponse;
    use crate::test_support::ScriptedTransport;

    fn target() -> HttpTarget {
        HttpTarget {
            name: "api".into(),
            url: "https://api.example.com/health".into(),
            ..Default::default()
        }
    }

    fn sink() -> MetricSink {
        MetricSink::new(&MetricsRegistry::new(), "test", ReasonLabels::Raw)
    }

    #[tokio::test]
    async fn test_ok_status() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::new(200))]);
        let sink = sink();
        let probe = HttpProbe::new(&target(), transport.clone(), sink.clone());

        let outcome = probe.execute(&CancellationToken::new()).await;

        assert!(outcome.is_success());
        assert_eq!(transport.requests()[0].url, "https://api.example.com/health");
        assert_eq!(transport.requests()[0].basic_auth, None);
        assert!(!transport.requests()[0].capture_body);
        assert_eq!(sink.gauge().get(&["api"]), Some(1.0));
    }

    #[tokio::test]
    async fn test_non_200_reason_is_status_line() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::new(302))]);
        let probe = HttpProbe::new(&target(), transport, sink());

        let outcome = probe.execute(&CancellationToken::new()).await;

        assert_eq!(outcome.code(), 1);
        assert_eq!(outcome.reason(), "302 Found");
    }

    #[tokio::test]
    async fn test_basic_auth_when_complete() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::new(200))]);
        let mut target = target();
        target.username = "user".into();
        target.password = "pass".into();

        HttpProbe::new(&target, transport.clone(), sink())
            .execute(&CancellationToken::new())
            .await;

        assert_eq!(
            transport.requests()[0].basic_auth,
            Some(("user".to_string(), "pass".to_string()))
        );
    }
}
