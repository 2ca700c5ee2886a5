//! HTTP transport built on reqwest.

use std::time::Duration;

use async_trait::async_trait;
use feedq_core::config::FeedConfig;
use feedq_core::request::ChunkRequest;
use feedq_core::{Error, Result};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::source::Source;

/// Fetches chunks with `GET {base}{path}?offset=..&limit=..[&sheet=..]`.
///
/// Absolute paths (`https://...`) are requested as-is; relative paths need
/// a base URL. The configured timeout applies per request.
pub struct HttpSource {
    client: reqwest::Client,
    base: Option<Url>,
}

impl HttpSource {
    pub fn new(cfg: &FeedConfig) -> Result<Self> {
        let base = cfg
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| {
                    Error::InvalidConfiguration(format!("invalid base URL '{raw}': {e}"))
                })
            })
            .transpose()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(|e| {
                Error::InvalidConfiguration(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    pub fn url_for(&self, request: &ChunkRequest) -> Result<Url> {
        let rendered = request.render();
        match Url::parse(&rendered) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base.as_ref().ok_or_else(|| {
                    Error::InvalidConfiguration(format!(
                        "relative path '{}' needs a base URL",
                        request.path
                    ))
                })?;
                base.join(&rendered).map_err(|e| {
                    Error::InvalidConfiguration(format!("cannot resolve '{}': {e}", request.path))
                })
            }
            Err(e) => Err(Error::InvalidConfiguration(format!(
                "invalid path '{}': {e}",
                request.path
            ))),
        }
    }
}

#[async_trait]
impl Source for HttpSource {
    async fn fetch(&self, request: &ChunkRequest) -> Result<Value> {
        let url = self.url_for(request)?;
        debug!(%url, offset = request.offset, limit = request.limit, "GET chunk");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(path = %request.path, offset = request.offset, error = %e, "transport error");
            request.fetch_failed(e.status().map(|s| s.as_u16()), e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(path = %request.path, offset = request.offset, %status, "unsuccessful status");
            return Err(request.fetch_failed(
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or("unsuccessful status"),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| request.fetch_failed(Some(status.as_u16()), e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| request.malformed(format!("invalid JSON: {e}")))
    }
}
