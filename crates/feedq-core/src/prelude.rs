//! Convenient re-exports for downstream crates.

pub use crate::config::{FeedConfig, DEFAULT_CHUNK_SIZE};
pub use crate::envelope::{Document, Envelope};
pub use crate::error::{Error, Result};
pub use crate::request::ChunkRequest;
pub use crate::types::Record;
