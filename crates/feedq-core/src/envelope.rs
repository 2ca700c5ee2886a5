//! Paginated wire envelope and the documents that carry it.
//!
//! Single-sheet body:
//! ```json
//! { "total": 612, "offset": 0, "limit": 255, "data": [ {...}, ... ] }
//! ```
//! Multi-sheet body: one envelope per sheet, keyed by sheet name, plus a
//! `:names` list. Other `:`-prefixed keys (`:type`, `:version`) are ignored.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::request::ChunkRequest;
use crate::types::Record;

/// Sheet picked when a multi-sheet document is read without a selector.
pub const DEFAULT_SHEET: &str = "default";

const NAMES_KEY: &str = ":names";

/// One chunk of a sheet. Built only through `Document::parse`, which owns
/// the wire rules (a missing `limit` means `data.len()`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub data: Vec<Record>,
}

impl Envelope {
    /// Offset one past the last record in this chunk.
    pub fn end(&self) -> usize {
        self.offset + self.data.len()
    }

    fn from_object(obj: &Map<String, Value>) -> std::result::Result<Self, String> {
        let total = required_count(obj, "total")?;
        let offset = required_count(obj, "offset")?;
        let rows = match obj.get("data") {
            Some(Value::Array(rows)) => rows,
            Some(_) => return Err("field 'data' is not an array".into()),
            None => return Err("missing field 'data'".into()),
        };

        let mut data = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            match row {
                Value::Object(map) => data.push(Record::from(map.clone())),
                _ => return Err(format!("data[{i}] is not an object")),
            }
        }

        let limit = match obj.get("limit") {
            None | Some(Value::Null) => data.len(),
            Some(v) => v
                .as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| "field 'limit' is not a non-negative integer".to_string())?,
        };

        Ok(Self {
            total,
            offset,
            limit,
            data,
        })
    }
}

fn required_count(obj: &Map<String, Value>, field: &str) -> std::result::Result<usize, String> {
    match obj.get(field) {
        Some(v) => v
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| format!("field '{field}' is not a non-negative integer")),
        None => Err(format!("missing field '{field}'")),
    }
}

/// A parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Single(Envelope),
    Multi {
        names: Vec<String>,
        sheets: BTreeMap<String, Map<String, Value>>,
    },
}

impl Document {
    /// Parse the body returned for `request`. Schema violations become
    /// `MalformedEnvelope` tagged with the request's path and offset.
    pub fn parse(value: Value, request: &ChunkRequest) -> Result<Self> {
        Self::from_value(value).map_err(|reason| request.malformed(reason))
    }

    fn from_value(value: Value) -> std::result::Result<Self, String> {
        let Value::Object(mut obj) = value else {
            return Err("body is not a JSON object".into());
        };

        let Some(names) = obj.get(NAMES_KEY) else {
            return Envelope::from_object(&obj).map(Document::Single);
        };

        let names: Vec<String> = names
            .as_array()
            .ok_or_else(|| format!("'{NAMES_KEY}' is not an array"))?
            .iter()
            .map(|n| {
                n.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("'{NAMES_KEY}' holds a non-string entry"))
            })
            .collect::<std::result::Result<_, _>>()?;

        // Sheets are validated lazily: only the one `select` picks must be
        // a well-formed envelope.
        let sheets = names
            .iter()
            .filter_map(|name| match obj.remove(name) {
                Some(Value::Object(sheet)) => Some((name.clone(), sheet)),
                _ => None,
            })
            .collect();

        Ok(Document::Multi { names, sheets })
    }

    /// Sheet names advertised by the document. Empty for single-sheet bodies.
    pub fn names(&self) -> &[String] {
        match self {
            Document::Single(_) => &[],
            Document::Multi { names, .. } => names,
        }
    }

    /// Pick the envelope `request` asked for.
    ///
    /// A single-sheet body is returned as-is: the server already applied the
    /// `sheet` query parameter. For a multi-sheet body an explicit sheet must
    /// be listed in `:names`; without one, `default` (or else the first
    /// listed sheet) is used.
    pub fn select(self, request: &ChunkRequest) -> Result<Envelope> {
        match self {
            Document::Single(envelope) => Ok(envelope),
            Document::Multi { names, mut sheets } => {
                let name = match request.sheet.as_deref() {
                    Some(wanted) => {
                        if !names.iter().any(|n| n == wanted) {
                            return Err(Error::SheetNotFound {
                                path: request.path.clone(),
                                sheet: wanted.to_string(),
                            });
                        }
                        wanted.to_string()
                    }
                    None if names.iter().any(|n| n == DEFAULT_SHEET) => DEFAULT_SHEET.to_string(),
                    None => names
                        .first()
                        .cloned()
                        .ok_or_else(|| request.malformed("multi-sheet document lists no sheets"))?,
                };
                let sheet = sheets.remove(&name).ok_or_else(|| {
                    request.malformed(format!(
                        "sheet '{name}' listed in '{NAMES_KEY}' but missing"
                    ))
                })?;
                Envelope::from_object(&sheet)
                    .map_err(|e| request.malformed(format!("sheet '{name}': {e}")))
            }
        }
    }
}
