//! Lazy, chainable query over one paginated feed.
//!
//! ```ignore
//! let mut q = client
//!     .open("/query-index.json")?
//!     .sheet("articles")?
//!     .filter(|r| r.get_str("section") == Some("news"))
//!     .slice(10)
//!     .limit(5);
//! let page = q.all().await?;
//! ```
//!
//! Evaluation order per raw record: stages in registration order, then the
//! slice/limit bounds on the position among records that survived every
//! stage. Chunk N+1 is requested only after chunk N is exhausted and more
//! records are still wanted.
//!
//! Terminal operations borrow the builder mutably, so one builder can never
//! drive two consumptions at once. Running a terminal operation again on the
//! same builder replays cached chunks instead of refetching them. Once the
//! first chunk has been requested the descriptor is frozen: `sheet`,
//! `chunks` and `filter_expr` return `InvalidConfiguration`, and the other
//! chaining calls make every later terminal operation return it.

use std::sync::Arc;

use async_stream::try_stream;
use futures::{Stream, TryStreamExt};
use tracing::{debug, trace, warn};

use feedq_core::config::{FeedConfig, DEFAULT_CHUNK_SIZE};
use feedq_core::envelope::{Document, Envelope};
use feedq_core::request::ChunkRequest;
use feedq_core::types::Record;
use feedq_core::{Error, Result};
use feedq_io::SharedSource;
use feedq_operators::{Filter, Map, Pipeline, Stage};

use crate::cache::ChunkCache;
use crate::metrics::FetchStats;

pub struct QueryBuilder {
    path: String,
    source: SharedSource,
    sheet: Option<String>,
    chunk_size: usize,
    pipeline: Pipeline,
    slice_start: usize,
    limit: Option<usize>,
    cache: ChunkCache,
    stats: FetchStats,
    started: bool,
    /// First chaining call rejected after consumption started. Every later
    /// terminal operation fails with it.
    rejected: Option<String>,
}

impl QueryBuilder {
    /// Describe a query over `path`. Nothing is fetched until a terminal
    /// operation runs.
    pub fn new(path: impl Into<String>, source: SharedSource) -> Result<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "feed path must not be empty".into(),
            ));
        }
        Ok(Self {
            path,
            source,
            sheet: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pipeline: Pipeline::new(),
            slice_start: 0,
            limit: None,
            cache: ChunkCache::new(),
            stats: FetchStats::default(),
            started: false,
            rejected: None,
        })
    }

    /// Replace the fetch capability. Cached chunks came from the old source
    /// and are dropped.
    pub fn with_source(mut self, source: SharedSource) -> Self {
        self.source = source;
        self.cache.clear();
        self
    }

    /// Apply the configured default chunk width.
    pub fn with_config(self, cfg: &FeedConfig) -> Result<Self> {
        self.chunks(cfg.chunk_size)
    }

    /// Select a sheet of a multi-sheet document. An unknown name surfaces as
    /// `SheetNotFound` from the first fetch, not here.
    pub fn sheet(mut self, name: impl Into<String>) -> Result<Self> {
        self.ensure_not_started("sheet")?;
        if let Some(existing) = &self.sheet {
            return Err(Error::InvalidConfiguration(format!(
                "sheet already selected ('{existing}')"
            )));
        }
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidConfiguration(
                "sheet name must not be empty".into(),
            ));
        }
        self.sheet = Some(name);
        Ok(self)
    }

    /// Chunk width for paginated fetches (default 255).
    pub fn chunks(mut self, size: usize) -> Result<Self> {
        self.ensure_not_started("chunks")?;
        if size == 0 {
            return Err(Error::InvalidConfiguration(
                "chunk size must be a positive integer".into(),
            ));
        }
        self.chunk_size = size;
        Ok(self)
    }

    pub fn map<F>(self, transform: F) -> Self
    where
        F: Fn(Record) -> Record + Send + Sync + 'static,
    {
        self.stage(Box::new(Map::new(transform)))
    }

    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.stage(Box::new(Filter::new(predicate)))
    }

    /// Filter on a `field OP literal` expression, e.g. `"section == news"`.
    pub fn filter_expr(self, expr: &str) -> Result<Self> {
        self.ensure_not_started("filter_expr")?;
        let filter = Filter::expr(expr)?;
        Ok(self.stage(Box::new(filter)))
    }

    pub fn rename(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.stage(Box::new(Map::rename(from, to)))
    }

    pub fn stage(self, stage: Box<dyn Stage>) -> Self {
        let name = stage.name();
        self.configure(name, |q| q.pipeline.push(stage))
    }

    /// Skip the first `start` records that survive every stage.
    pub fn slice(self, start: usize) -> Self {
        self.configure("slice", |q| q.slice_start = start)
    }

    /// Emit at most `n` records (after stages and slice).
    pub fn limit(self, n: usize) -> Self {
        self.configure("limit", |q| q.limit = Some(n))
    }

    /// Apply an infallible chaining call. Once consumption has started the
    /// builder is left unchanged and terminal operations fail with
    /// `InvalidConfiguration` from then on.
    fn configure(mut self, call: &str, apply: impl FnOnce(&mut Self)) -> Self {
        match self.ensure_not_started(call) {
            Ok(()) => apply(&mut self),
            Err(_) if self.rejected.is_some() => {}
            Err(_) => self.rejected = Some(format!("{call}() called after consumption started")),
        }
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn slice_start(&self) -> usize {
        self.slice_start
    }

    pub fn limit_bound(&self) -> Option<usize> {
        self.limit
    }

    pub fn stages(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Counters accumulated over every terminal operation on this builder.
    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    pub fn cached_chunks(&self) -> usize {
        self.cache.len()
    }

    fn ensure_not_started(&self, call: &str) -> Result<()> {
        if self.started {
            return Err(Error::InvalidConfiguration(format!(
                "{call}() called after consumption started"
            )));
        }
        Ok(())
    }

    /// Records one at a time. Dropping the stream stops further fetches; an
    /// error ends the stream.
    pub fn stream(&mut self) -> impl Stream<Item = Result<Record>> + Send + '_ {
        let Self {
            path,
            source,
            sheet,
            chunk_size,
            pipeline,
            slice_start,
            limit,
            cache,
            stats,
            started,
            rejected,
        } = self;
        let chunk_size = *chunk_size;
        let skip = *slice_start;
        let limit = *limit;
        let rejected = rejected.clone();

        try_stream! {
            if let Some(reason) = rejected {
                Err::<(), _>(Error::InvalidConfiguration(reason))?;
            }
            *started = true;

            let mut chunk_offset = 0usize;
            let mut position = 0usize;
            let mut emitted = 0usize;
            let mut done = limit == Some(0);

            while !done {
                let request = ChunkRequest::new(path.clone(), chunk_offset, chunk_size, sheet.clone());
                let envelope = match cache.get(chunk_offset) {
                    Some(envelope) => {
                        trace!(path = %path, offset = chunk_offset, "chunk cache hit");
                        stats.cache_hits += 1;
                        envelope
                    }
                    None => {
                        let envelope = fetch_chunk(source, &request).await?;
                        stats.chunks_fetched += 1;
                        cache.insert(chunk_offset, envelope)
                    }
                };

                for raw in &envelope.data {
                    stats.records_scanned += 1;
                    let Some(record) = pipeline.run(raw.clone()) else {
                        continue;
                    };
                    position += 1;
                    if position <= skip {
                        continue;
                    }
                    stats.records_emitted += 1;
                    emitted += 1;
                    yield record;
                    if limit.is_some_and(|n| emitted >= n) {
                        done = true;
                        break;
                    }
                }

                chunk_offset += chunk_size;
                if envelope.data.is_empty() || chunk_offset >= envelope.total {
                    done = true;
                }
            }
        }
    }

    /// Drain the query into a vector, honoring slice and limit.
    pub async fn all(&mut self) -> Result<Vec<Record>> {
        let records: Vec<Record> = self.stream().try_collect().await?;
        self.stats.emit(&self.path);
        Ok(records)
    }

    /// The first record the query would emit, fetching only as far as needed.
    pub async fn first(&mut self) -> Result<Option<Record>> {
        let first = {
            let mut stream = std::pin::pin!(self.stream());
            stream.try_next().await?
        };
        self.stats.emit(&self.path);
        Ok(first)
    }
}

async fn fetch_chunk(source: &SharedSource, request: &ChunkRequest) -> Result<Arc<Envelope>> {
    let body = source.fetch(request).await.inspect_err(|e| {
        warn!(path = %request.path, offset = request.offset, error = %e, "chunk fetch failed");
    })?;
    let envelope = Document::parse(body, request)?
        .select(request)
        .inspect_err(|e| {
            warn!(path = %request.path, offset = request.offset, error = %e, "unusable chunk");
        })?;
    debug!(
        path = %request.path,
        offset = request.offset,
        rows = envelope.data.len(),
        total = envelope.total,
        "chunk fetched"
    );
    Ok(Arc::new(envelope))
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("path", &self.path)
            .field("sheet", &self.sheet)
            .field("chunk_size", &self.chunk_size)
            .field("stages", &self.pipeline)
            .field("slice_start", &self.slice_start)
            .field("limit", &self.limit)
            .field("cached_chunks", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedq_io::{Fault, MemorySource};
    use futures::StreamExt;
    use serde_json::json;

    const PATH: &str = "/query-index.json";

    fn articles(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::from_pairs([
                    ("id", i.to_string()),
                    ("section", (if i % 3 == 0 { "news" } else { "sports" }).to_string()),
                ])
            })
            .collect()
    }

    fn ids(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.get_str("id").unwrap_or_default().to_string())
            .collect()
    }

    fn setup(n: usize) -> (MemorySource, SharedSource) {
        let mem = MemorySource::new();
        mem.insert(PATH, articles(n));
        let shared: SharedSource = Arc::new(mem.clone());
        (mem, shared)
    }

    #[test]
    fn empty_path_is_rejected() {
        let (_, src) = setup(0);
        assert!(matches!(
            QueryBuilder::new("  ", src),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let (_, src) = setup(0);
        let err = QueryBuilder::new(PATH, src).unwrap().chunks(0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn sheet_at_most_once() {
        let (_, src) = setup(0);
        let q = QueryBuilder::new(PATH, src).unwrap().sheet("a").unwrap();
        assert!(matches!(q.sheet("b"), Err(Error::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn sheet_after_consumption_is_rejected() {
        let (_, src) = setup(3);
        let mut q = QueryBuilder::new(PATH, src).unwrap();
        q.all().await.unwrap();
        assert!(matches!(q.sheet("x"), Err(Error::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn construction_does_not_fetch() {
        let (mem, src) = setup(10);
        let _q = QueryBuilder::new(PATH, src)
            .unwrap()
            .sheet("nowhere")
            .unwrap()
            .chunks(2)
            .unwrap()
            .limit(1);
        assert!(mem.requests().is_empty());
    }

    #[tokio::test]
    async fn all_tiles_chunks_in_order() {
        let (mem, src) = setup(10);
        let mut q = QueryBuilder::new(PATH, src).unwrap().chunks(4).unwrap();
        let out = q.all().await.unwrap();
        assert_eq!(ids(&out), (0..10).map(|i| i.to_string()).collect::<Vec<_>>());

        let offsets: Vec<(usize, usize)> = mem.requests().iter().map(|r| (r.offset, r.limit)).collect();
        assert_eq!(offsets, vec![(0, 4), (4, 4), (8, 4)]);
        assert_eq!(q.stats().chunks_fetched, 3);
        assert_eq!(q.stats().records_emitted, 10);
    }

    #[tokio::test]
    async fn slice_counts_filtered_positions() {
        let (_, src) = setup(20);
        // news ids: 0 3 6 9 12 15 18
        let mut q = QueryBuilder::new(PATH, src)
            .unwrap()
            .chunks(5)
            .unwrap()
            .filter_expr("section == news")
            .unwrap()
            .slice(2)
            .limit(3);
        assert_eq!(ids(&q.all().await.unwrap()), ["6", "9", "12"]);
    }

    #[tokio::test]
    async fn limit_stops_fetching() {
        let (mem, src) = setup(30);
        let mut q = QueryBuilder::new(PATH, src).unwrap().chunks(10).unwrap().limit(10);
        assert_eq!(q.all().await.unwrap().len(), 10);
        assert_eq!(mem.fetch_count(PATH), 1);
    }

    #[tokio::test]
    async fn limit_zero_fetches_nothing() {
        let (mem, src) = setup(5);
        let mut q = QueryBuilder::new(PATH, src).unwrap().limit(0);
        assert!(q.all().await.unwrap().is_empty());
        assert_eq!(mem.fetch_count(PATH), 0);
    }

    #[tokio::test]
    async fn second_run_uses_cache() {
        let (mem, src) = setup(12);
        let mut q = QueryBuilder::new(PATH, src).unwrap().chunks(5).unwrap();
        let first = q.all().await.unwrap();
        let second = q.all().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(mem.fetch_count(PATH), 3);
        assert_eq!(q.stats().cache_hits, 3);
        assert_eq!(q.cached_chunks(), 3);
    }

    async fn consumed(n: usize) -> (MemorySource, QueryBuilder) {
        let (mem, src) = setup(n);
        let mut q = QueryBuilder::new(PATH, src).unwrap().chunks(4).unwrap();
        assert_eq!(q.all().await.unwrap().len(), n);
        (mem, q)
    }

    async fn assert_frozen(mut q: QueryBuilder, mem: &MemorySource) {
        let fetches = mem.fetch_count(PATH);
        assert!(matches!(q.all().await, Err(Error::InvalidConfiguration(_))));
        assert!(matches!(q.first().await, Err(Error::InvalidConfiguration(_))));
        assert_eq!(mem.fetch_count(PATH), fetches);
    }

    #[tokio::test]
    async fn map_after_consumption_is_rejected() {
        let (mem, q) = consumed(10).await;
        assert_frozen(q.map(|r| r), &mem).await;
    }

    #[tokio::test]
    async fn filter_after_consumption_is_rejected() {
        let (mem, q) = consumed(10).await;
        assert_frozen(q.filter(|_| true), &mem).await;
    }

    #[tokio::test]
    async fn filter_expr_after_consumption_is_rejected() {
        let (_, q) = consumed(10).await;
        assert!(matches!(
            q.filter_expr("section == news"),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn rename_after_consumption_is_rejected() {
        let (mem, q) = consumed(10).await;
        assert_frozen(q.rename("section", "kind"), &mem).await;
    }

    #[tokio::test]
    async fn stage_after_consumption_is_rejected() {
        let (mem, q) = consumed(10).await;
        assert_frozen(q.stage(Box::new(Map::rename("id", "key"))), &mem).await;
    }

    #[tokio::test]
    async fn slice_after_consumption_is_rejected() {
        let (mem, q) = consumed(10).await;
        let q = q.slice(1);
        assert_eq!(q.slice_start(), 0);
        assert_frozen(q, &mem).await;
    }

    #[tokio::test]
    async fn limit_after_consumption_is_rejected() {
        let (mem, q) = consumed(10).await;
        let q = q.limit(1);
        assert_eq!(q.limit_bound(), None);
        assert_frozen(q, &mem).await;
    }

    #[tokio::test]
    async fn unpolled_stream_does_not_freeze_builder() {
        let (mem, src) = setup(5);
        let mut q = QueryBuilder::new(PATH, src).unwrap();
        drop(q.stream());
        let mut q = q.sheet("articles").unwrap().chunks(2).unwrap().limit(3);
        assert_eq!(mem.fetch_count(PATH), 0);
        assert_eq!(q.all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn with_source_drops_cached_chunks() {
        let (old, src) = setup(4);
        let mut q = QueryBuilder::new(PATH, src).unwrap().chunks(2).unwrap();
        q.all().await.unwrap();
        assert_eq!(q.cached_chunks(), 2);

        let (new, src) = setup(6);
        let mut q = q.with_source(src);
        assert_eq!(q.cached_chunks(), 0);
        assert_eq!(q.all().await.unwrap().len(), 6);
        assert_eq!(old.fetch_count(PATH), 2);
        assert_eq!(new.fetch_count(PATH), 3);
    }

    #[tokio::test]
    async fn dropping_stream_stops_fetches() {
        let (mem, src) = setup(50);
        let mut q = QueryBuilder::new(PATH, src).unwrap().chunks(10).unwrap();
        {
            let mut stream = std::pin::pin!(q.stream());
            for _ in 0..12 {
                stream.next().await.unwrap().unwrap();
            }
        }
        assert_eq!(mem.fetch_count(PATH), 2);
    }

    #[tokio::test]
    async fn first_fetches_until_a_match() {
        let (mem, src) = setup(30);
        let mut q = QueryBuilder::new(PATH, src)
            .unwrap()
            .chunks(5)
            .unwrap()
            .filter(|r| r.get_str("id") == Some("7"));
        let hit = q.first().await.unwrap().unwrap();
        assert_eq!(hit.get_str("id"), Some("7"));
        assert_eq!(mem.fetch_count(PATH), 2);
    }

    #[tokio::test]
    async fn malformed_chunk_halts_stream() {
        let (mem, src) = setup(10);
        mem.fail_at(PATH, 4, Fault::Body(json!({"total": 10, "offset": 4})));
        let mut q = QueryBuilder::new(PATH, src).unwrap().chunks(4).unwrap();

        let mut seen = Vec::new();
        let mut error = None;
        {
            let mut stream = std::pin::pin!(q.stream());
            while let Some(item) = stream.next().await {
                match item {
                    Ok(r) => seen.push(r),
                    Err(e) => {
                        error = Some(e);
                        break;
                    }
                }
            }
        }
        assert_eq!(seen.len(), 4);
        assert!(matches!(
            error,
            Some(Error::MalformedEnvelope { offset: 4, .. })
        ));
        assert_eq!(mem.fetch_count(PATH), 2);
    }

    #[tokio::test]
    async fn map_runs_before_filter() {
        let (_, src) = setup(6);
        let mut q = QueryBuilder::new(PATH, src)
            .unwrap()
            .rename("section", "kind")
            .filter_expr("kind == news")
            .unwrap();
        let out = q.all().await.unwrap();
        assert_eq!(ids(&out), ["0", "3"]);
        assert!(out.iter().all(|r| !r.contains("section")));
    }
}
