//! Entry points for opening queries.

use std::sync::Arc;

use feedq_core::config::FeedConfig;
use feedq_core::Result;
use feedq_io::{SharedSource, Source};

use crate::index::IndexCache;
use crate::query::QueryBuilder;

/// A source plus the configuration every query opened through it inherits.
/// Cheap to clone; clones share the source.
#[derive(Clone)]
pub struct FeedClient {
    source: SharedSource,
    config: FeedConfig,
}

impl FeedClient {
    pub fn new<S: Source + 'static>(source: S, config: FeedConfig) -> Self {
        Self::with_shared(Arc::new(source), config)
    }

    pub fn with_shared(source: SharedSource, config: FeedConfig) -> Self {
        Self { source, config }
    }

    /// HTTP-backed client built from `config`.
    #[cfg(feature = "http")]
    pub fn http(config: FeedConfig) -> Result<Self> {
        let source = feedq_io::HttpSource::new(&config)?;
        Ok(Self::new(source, config))
    }

    /// HTTP-backed client configured from `FEEDQ_*` environment variables.
    #[cfg(feature = "http")]
    pub fn from_env() -> Result<Self> {
        Self::http(FeedConfig::from_env())
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn source(&self) -> SharedSource {
        Arc::clone(&self.source)
    }

    /// Start a query over `path`. No request is made yet.
    pub fn open(&self, path: impl Into<String>) -> Result<QueryBuilder> {
        QueryBuilder::new(path, self.source())?.with_config(&self.config)
    }

    /// Whole-document cache for `path`, fetched through this client's source.
    pub fn index(&self, path: impl Into<String>) -> Result<IndexCache> {
        IndexCache::new(path, self.source())?.with_chunk_size(self.config.chunk_size)
    }
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Open `path` over HTTP with configuration from the environment.
#[cfg(feature = "http")]
pub fn open(path: impl Into<String>) -> Result<QueryBuilder> {
    FeedClient::from_env()?.open(path)
}
