//! Registry Probe
//!
//! Checks that every configured tag of an image is resolvable.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{record_check, Probe};
use crate::config::RegistryTarget;
use crate::observability::MetricSink;
use crate::outcome::Outcome;
use crate::registry::{HttpTransport, ImageReference, RegistryClient};

pub struct RegistryProbe {
    name: String,
    image: ImageReference,
    tags: Vec<String>,
    client: RegistryClient,
    sink: MetricSink,
}

impl RegistryProbe {
    pub fn new(target: &RegistryTarget, transport: Arc<dyn HttpTransport>, sink: MetricSink) -> Self {
        Self {
            name: target.name.clone(),
            image: ImageReference::parse(&target.image),
            tags: target.tags.clone(),
            client: RegistryClient::new(transport, target.credentials()),
            sink,
        }
    }
}

#[async_trait]
impl Probe for RegistryProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "registry"
    }

    async fn execute(&self, cancel: &CancellationToken) -> Outcome {
        record_check(
            &self.name,
            self.kind(),
            &self.sink,
            cancel,
            self.client.check_all_tags(&self.image, &self.tags),
        )
        .await
    }
}
