//! Map stage with column renaming support.

use std::collections::HashMap;

use feedq_core::types::Record;

use crate::traits::Stage;

type TransformFn = dyn Fn(Record) -> Record + Send + Sync;

enum Transform {
    Func(Box<TransformFn>),
    /// Field rename map: old_name -> new_name
    Renames(HashMap<String, String>),
}

pub struct Map {
    transform: Transform,
}

impl Map {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(Record) -> Record + Send + Sync + 'static,
    {
        Self {
            transform: Transform::Func(Box::new(transform)),
        }
    }

    pub fn renames(renames: HashMap<String, String>) -> Self {
        Self {
            transform: Transform::Renames(renames),
        }
    }

    pub fn rename(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::renames(HashMap::from([(from.into(), to.into())]))
    }
}

impl Stage for Map {
    fn name(&self) -> &'static str {
        "map"
    }

    fn apply(&self, record: Record) -> Option<Record> {
        match &self.transform {
            Transform::Func(f) => Some(f(record)),
            Transform::Renames(renames) => {
                // If no renames, pass through
                if renames.is_empty() {
                    return Some(record);
                }
                let mut out = Record::new();
                for (name, value) in record.fields() {
                    let name = renames.get(name).unwrap_or(name);
                    out.insert(name.clone(), value.clone());
                }
                Some(out)
            }
        }
    }
}
