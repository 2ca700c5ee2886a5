#![forbid(unsafe_code)]
//! feedq-io: where chunks come from.
//!
//! - `source`: the async `Source` trait the query engine pulls chunks through.
//! - `http`: `HttpSource`, a reqwest transport (feature `http`, on by default).
//! - `memory_source`: `MemorySource`, an in-process source for tests and demos.

pub mod memory_source;
pub mod source;

#[cfg(feature = "http")]
pub mod http;

pub use memory_source::{Fault, MemorySource};
pub use source::{SharedSource, Source};

#[cfg(feature = "http")]
pub use http::HttpSource;
