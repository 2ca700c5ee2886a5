//! Fetch counters for one query.
//!
//! Plain counters, surfaced through `QueryBuilder::stats()` and logged at
//! debug level when a terminal operation finishes.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    /// Chunks pulled from the source.
    pub chunks_fetched: usize,
    /// Chunks served from the query's own cache.
    pub cache_hits: usize,
    /// Raw records read from envelopes, before stages.
    pub records_scanned: usize,
    /// Records handed to the consumer.
    pub records_emitted: usize,
}

impl FetchStats {
    pub fn emit(&self, path: &str) {
        tracing::debug!(
            path,
            chunks_fetched = self.chunks_fetched,
            cache_hits = self.cache_hits,
            records_scanned = self.records_scanned,
            records_emitted = self.records_emitted,
            "query finished"
        );
    }
}
