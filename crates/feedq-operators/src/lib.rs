#![forbid(unsafe_code)]
//! feedq-operators: per-record stages applied while a feed streams by.
//!
//! Design intent:
//! - Stages are pure and synchronous; all I/O stays in `feedq-io`.
//! - A stage sees one record at a time and either passes it on (possibly
//!   transformed) or drops it. Ordering is never changed.

pub mod filter;
pub mod map;
pub mod pipeline;
pub mod predicate;
pub mod traits;

pub use filter::Filter;
pub use map::Map;
pub use pipeline::Pipeline;
pub use predicate::{CompareOp, Predicate};
pub use traits::{OpError, Stage};
