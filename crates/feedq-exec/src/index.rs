//! Shared cache for documents that are always read whole.
//!
//! Unlike the per-query `ChunkCache`, an `IndexCache` is meant to be shared
//! (behind an `Arc` or a static) by every caller that needs the same index.
//! The first `get()` loads it; callers that arrive while the load is in
//! flight wait for that same load. A failed load is not cached. The cached
//! value lives until `invalidate()`.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;
use tracing::info;

use feedq_core::config::DEFAULT_CHUNK_SIZE;
use feedq_core::types::Record;
use feedq_core::{Error, Result};
use feedq_io::SharedSource;

use crate::query::QueryBuilder;

type Slot = Arc<OnceCell<Arc<Vec<Record>>>>;

pub struct IndexCache {
    path: String,
    source: SharedSource,
    chunk_size: usize,
    slot: Mutex<Slot>,
}

impl IndexCache {
    pub fn new(path: impl Into<String>, source: SharedSource) -> Result<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "index path must not be empty".into(),
            ));
        }
        Ok(Self {
            path,
            source,
            chunk_size: DEFAULT_CHUNK_SIZE,
            slot: Mutex::new(Arc::new(OnceCell::new())),
        })
    }

    pub fn with_chunk_size(mut self, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidConfiguration(
                "chunk size must be a positive integer".into(),
            ));
        }
        self.chunk_size = size;
        Ok(self)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every record of the index, loading it on first use.
    pub async fn get(&self) -> Result<Arc<Vec<Record>>> {
        let slot = Arc::clone(&self.slot());
        slot.get_or_try_init(|| self.load()).await.cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot().initialized()
    }

    /// Drop the cached index; the next `get()` reloads it. A load already in
    /// flight completes for its own waiters only.
    pub fn invalidate(&self) {
        *self.slot() = Arc::new(OnceCell::new());
    }

    async fn load(&self) -> Result<Arc<Vec<Record>>> {
        let mut query = QueryBuilder::new(self.path.clone(), Arc::clone(&self.source))?
            .chunks(self.chunk_size)?;
        let records = query.all().await?;
        info!(path = %self.path, records = records.len(), "index loaded");
        Ok(Arc::new(records))
    }
}
