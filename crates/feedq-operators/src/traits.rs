//! Stage trait + common interfaces.
//!
//! The query executor owns a `Pipeline` of stages and calls `apply(...)` on
//! each raw record in source order. Only records that come out of the last
//! stage count toward slice/limit bounds.

use feedq_core::types::Record;
use feedq_core::Error;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("unparseable predicate: {0}")]
    Parse(String),
}

impl From<OpError> for Error {
    fn from(e: OpError) -> Self {
        Error::InvalidConfiguration(e.to_string())
    }
}

/// Trait that all stages must implement.
///
/// Invariants:
/// - `apply` must be deterministic: the same input record always produces the
///   same output, so re-running a query over a stable feed is repeatable.
/// - `apply` must not reorder or buffer records.
pub trait Stage: Send + Sync + 'static {
    /// Human-readable stage name (stable).
    fn name(&self) -> &'static str;

    /// `Some(record)` to pass the (possibly transformed) record downstream,
    /// `None` to drop it.
    fn apply(&self, record: Record) -> Option<Record>;
}
