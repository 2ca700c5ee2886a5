//! In-memory feed source for testing.
//!
//! Serves collections registered by path and slices them into envelopes the
//! way the document server does. Every request is logged so tests can assert
//! exactly which chunks were pulled, and faults can be planted at a given
//! `(path, offset)`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use feedq_core::envelope::Envelope;
use feedq_core::request::ChunkRequest;
use feedq_core::types::Record;
use feedq_core::Result;
use serde_json::{Map, Value};

use crate::source::Source;

/// A failure planted at one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// Respond with this non-success HTTP status.
    Status(u16),
    /// Respond with this body instead of the real envelope.
    Body(Value),
}

#[derive(Debug, Clone)]
enum Feed {
    Single(Vec<Record>),
    Multi(Vec<(String, Vec<Record>)>),
}

#[derive(Default)]
struct State {
    feeds: HashMap<String, Feed>,
    faults: HashMap<(String, usize), Fault>,
    requests: Vec<ChunkRequest>,
}

/// Thread-safe in-memory source. Clones share the same state.
#[derive(Clone, Default)]
pub struct MemorySource {
    state: Arc<Mutex<State>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a single-sheet collection at `path`.
    pub fn insert(&self, path: impl Into<String>, records: Vec<Record>) {
        self.state().feeds.insert(path.into(), Feed::Single(records));
    }

    /// Register a multi-sheet collection at `path`. Sheet order is kept in
    /// the `:names` list.
    pub fn insert_sheets<N: Into<String>>(&self, path: impl Into<String>, sheets: Vec<(N, Vec<Record>)>) {
        let sheets = sheets.into_iter().map(|(n, r)| (n.into(), r)).collect();
        self.state().feeds.insert(path.into(), Feed::Multi(sheets));
    }

    pub fn fail_at(&self, path: impl Into<String>, offset: usize, fault: Fault) {
        self.state().faults.insert((path.into(), offset), fault);
    }

    pub fn clear_faults(&self) {
        self.state().faults.clear();
    }

    /// Every request served so far, in arrival order.
    pub fn requests(&self) -> Vec<ChunkRequest> {
        self.state().requests.clone()
    }

    /// Number of requests served for `path`.
    pub fn fetch_count(&self, path: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    pub fn reset_requests(&self) {
        self.state().requests.clear();
    }
}

fn envelope_for(records: &[Record], offset: usize, limit: usize) -> Envelope {
    let start = offset.min(records.len());
    let end = offset.saturating_add(limit).min(records.len());
    Envelope {
        total: records.len(),
        offset,
        limit,
        data: records[start..end].to_vec(),
    }
}

fn to_value(envelope: Envelope) -> Value {
    // Envelope is plain data; serialization cannot fail.
    serde_json::to_value(envelope).unwrap_or(Value::Null)
}

#[async_trait]
impl Source for MemorySource {
    async fn fetch(&self, request: &ChunkRequest) -> Result<Value> {
        let mut state = self.state();
        state.requests.push(request.clone());

        if let Some(fault) = state.faults.get(&(request.path.clone(), request.offset)) {
            return match fault {
                Fault::Status(code) => Err(request.fetch_failed(Some(*code), "planted failure")),
                Fault::Body(body) => Ok(body.clone()),
            };
        }

        let feed = state
            .feeds
            .get(&request.path)
            .ok_or_else(|| request.fetch_failed(Some(404), "Not Found"))?;

        let body = match feed {
            Feed::Single(records) => {
                let mut body = to_value(envelope_for(records, request.offset, request.limit));
                if let Value::Object(obj) = &mut body {
                    obj.insert(":type".into(), Value::from("sheet"));
                }
                body
            }
            Feed::Multi(sheets) => {
                let mut obj = Map::new();
                let names: Vec<Value> = sheets.iter().map(|(n, _)| Value::from(n.as_str())).collect();
                obj.insert(":names".into(), Value::Array(names));
                obj.insert(":type".into(), Value::from("multi-sheet"));
                for (name, records) in sheets {
                    obj.insert(
                        name.clone(),
                        to_value(envelope_for(records, request.offset, request.limit)),
                    );
                }
                Value::Object(obj)
            }
        };
        Ok(body)
    }
}
