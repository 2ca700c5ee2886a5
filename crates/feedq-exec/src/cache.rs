//! Per-query chunk cache.

use std::collections::HashMap;
use std::sync::Arc;

use feedq_core::envelope::Envelope;

/// Envelopes keyed by chunk offset. Owned by exactly one `QueryBuilder`;
/// entries are never replaced once inserted.
#[derive(Debug, Default)]
pub struct ChunkCache {
    chunks: HashMap<usize, Arc<Envelope>>,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, offset: usize) -> Option<Arc<Envelope>> {
        self.chunks.get(&offset).cloned()
    }

    /// Keep the first envelope seen for `offset`.
    pub fn insert(&mut self, offset: usize, envelope: Arc<Envelope>) -> Arc<Envelope> {
        Arc::clone(self.chunks.entry(offset).or_insert(envelope))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(total: usize) -> Arc<Envelope> {
        Arc::new(Envelope {
            total,
            offset: 0,
            limit: 10,
            data: vec![],
        })
    }

    #[test]
    fn first_insert_wins() {
        let mut cache = ChunkCache::new();
        cache.insert(0, env(5));
        let kept = cache.insert(0, env(9));
        assert_eq!(kept.total, 5);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(0).map(|e| e.total), Some(5));
        assert!(cache.get(10).is_none());
    }
}
