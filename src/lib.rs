#![forbid(unsafe_code)]
//! feedq: lazy, chainable queries over paginated spreadsheet-backed JSON feeds.
//!
//! Facade over the workspace crates:
//! - `feedq-core`: records, envelopes, errors, configuration
//! - `feedq-io`: the `Source` seam, HTTP and in-memory sources
//! - `feedq-operators`: map/filter stages and predicate expressions
//! - `feedq-exec`: `QueryBuilder`, `FeedClient`, `IndexCache`

pub use feedq_core::config::{FeedConfig, DEFAULT_CHUNK_SIZE};
pub use feedq_core::envelope::{Document, Envelope};
pub use feedq_core::request::ChunkRequest;
pub use feedq_core::types::Record;
pub use feedq_core::{Error, Result};

pub use feedq_io::{Fault, MemorySource, SharedSource, Source};
#[cfg(feature = "http")]
pub use feedq_io::HttpSource;

pub use feedq_operators::{CompareOp, Filter, Map, Pipeline, Predicate, Stage};

pub use feedq_exec::{ChunkCache, FeedClient, FetchStats, IndexCache, QueryBuilder};
#[cfg(feature = "http")]
pub use feedq_exec::open;
