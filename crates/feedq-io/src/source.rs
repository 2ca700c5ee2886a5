//! The fetch capability behind every query.

use std::sync::Arc;

use async_trait::async_trait;
use feedq_core::request::ChunkRequest;
use feedq_core::Result;
use serde_json::Value;

/// Fetches one chunk of a feed and returns the raw response body.
///
/// Implementations map their own failures into `feedq_core::Error`:
/// transport problems and non-success statuses become `FetchFailed`, an
/// unparseable body becomes `MalformedEnvelope`. Envelope validation and
/// sheet selection happen in the caller.
#[async_trait]
pub trait Source: Send + Sync {
    async fn fetch(&self, request: &ChunkRequest) -> Result<Value>;
}

pub type SharedSource = Arc<dyn Source>;

#[async_trait]
impl<S: Source + ?Sized> Source for Arc<S> {
    async fn fetch(&self, request: &ChunkRequest) -> Result<Value> {
        (**self).fetch(request).await
    }
}
