use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, header};
use uuid::Uuid;

use crate::{
    config::{GatewayConfig, ResourcePaths},
    gateway::{
        error::{GatewayError, GatewayErrorKind, decode_error, network_error, timeout_error},
        resource::{Resource, SnapshotPayload},
    },
};

/// Seam between the mirror runtime and the backend. The poll loop and the
/// initial load only ever see this trait, so tests swap in fakes.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, resource: Resource) -> Result<SnapshotPayload, GatewayError>;
}

pub struct HttpGateway {
    client: Client,
    base_url: String,
    request_timeout: Duration,
    paths: ResourcePaths,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_millis(config.request_timeout_ms.max(1)),
            paths: config.paths.clone(),
        })
    }

    pub fn url_for(&self, resource: Resource) -> String {
        let configured = match resource {
            Resource::Trust => self.paths.trust.as_deref(),
            Resource::Agency => self.paths.agency.as_deref(),
            Resource::Skills => self.paths.skills.as_deref(),
            Resource::Limbic => self.paths.limbic.as_deref(),
            Resource::Health => self.paths.health.as_deref(),
        };
        let path = configured.unwrap_or_else(|| resource.default_path());
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl SnapshotSource for HttpGateway {
    async fn fetch(&self, resource: Resource) -> Result<SnapshotPayload, GatewayError> {
        let url = self.url_for(resource);
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .header(header::ACCEPT, "application/json")
            .header("x-request-id", Uuid::new_v4().to_string())
            .send()
            .await
            .map_err(|err| classify_send_error(&err, resource))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::new(
                GatewayErrorKind::Status,
                format!("snapshot fetch returned {}", status),
            )
            .with_resource(resource)
            .with_http_status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| network_error(format!("body read failed: {err}")).with_resource(resource))?;

        SnapshotPayload::decode(resource, &body).map_err(|err| {
            decode_error(format!("snapshot body did not decode: {err}")).with_resource(resource)
        })
    }
}

fn classify_send_error(err: &reqwest::Error, resource: Resource) -> GatewayError {
    let message = format!("snapshot fetch failed: {err}");
    let error = if err.is_timeout() {
        timeout_error(message)
    } else {
        network_error(message)
    };
    error.with_resource(resource)
}
