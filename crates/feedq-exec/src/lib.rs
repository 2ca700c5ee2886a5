#![forbid(unsafe_code)]
//! feedq-exec: lazy evaluation of feed queries.
//!
//! A `QueryBuilder` accumulates sheet selection, chunk width, stages and
//! slice/limit bounds without touching the network. Terminal operations
//! (`stream`, `all`, `first`) pull chunks one at a time, only as far as the
//! bounds require, and cache every envelope for the builder's lifetime.
//!
//! `IndexCache` is the separate, shared, single-flight cache for documents
//! that are always read whole.

pub mod cache;
pub mod client;
pub mod index;
pub mod metrics;
pub mod query;

pub use cache::ChunkCache;
pub use client::FeedClient;
pub use index::IndexCache;
pub use metrics::FetchStats;
pub use query::QueryBuilder;

#[cfg(feature = "http")]
pub use client::open;
