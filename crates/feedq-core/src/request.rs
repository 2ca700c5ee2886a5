//! One chunk request against a feed path.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkRequest {
    pub path: String,
    pub offset: usize,
    pub limit: usize,
    pub sheet: Option<String>,
}

impl ChunkRequest {
    pub fn new(path: impl Into<String>, offset: usize, limit: usize, sheet: Option<String>) -> Self {
        Self {
            path: path.into(),
            offset,
            limit,
            sheet,
        }
    }

    /// Wire query parameters, in the order they are appended.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("offset", self.offset.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(sheet) = &self.sheet {
            pairs.push(("sheet", sheet.clone()));
        }
        pairs
    }

    /// `path` with the chunk parameters appended. An existing query string
    /// on the path is kept; a fragment is dropped.
    pub fn render(&self) -> String {
        let base = self.path.split('#').next().unwrap_or_default();
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (k, v) in self.query_pairs() {
            query.append_pair(k, &v);
        }
        let query = query.finish();

        if base.contains('?') {
            let sep = if base.ends_with('?') || base.ends_with('&') {
                ""
            } else {
                "&"
            };
            format!("{base}{sep}{query}")
        } else {
            format!("{base}?{query}")
        }
    }

    pub fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::malformed(self.path.clone(), self.offset, reason)
    }

    pub fn fetch_failed(&self, status: Option<u16>, detail: impl Into<String>) -> Error {
        Error::fetch_failed(self.path.clone(), self.offset, status, detail)
    }
}
