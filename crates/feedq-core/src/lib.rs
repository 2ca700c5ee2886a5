#![forbid(unsafe_code)]
//! feedq-core: the data model shared by every feedq crate.
//!
//! - `types`: the open `Record` type carried through query pipelines.
//! - `envelope`: the paginated wire envelope and single/multi-sheet documents.
//! - `request`: one chunk request (`offset`/`limit`/`sheet`) and its URL form.
//! - `config`: `FeedConfig`, serializable and loadable from the environment.
//! - `error`: the error taxonomy surfaced to terminal operations.
//!
//! No async, no HTTP, no runtime here. Sources live in `feedq-io`.

pub mod config;
pub mod envelope;
pub mod error;
pub mod prelude;
pub mod request;
pub mod types;

pub use error::{Error, Result};
