//! One record destined for (or read from) a table.
//!
//! `values` is positionally aligned with `TableDef::columns`: a row always
//! carries exactly the recognized columns, with NULL for absent ones.

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Value>,
    /// Unrecognized input columns, serialized as a JSON object. Only set for
    /// tables that support custom fields.
    pub extra: Option<String>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            extra: None,
        }
    }

    /// A row of `width` NULLs.
    pub fn nulls(width: usize) -> Self {
        Self::new(vec![Value::Null; width])
    }

    pub fn with_extra(mut self, extra: Option<String>) -> Self {
        self.extra = extra;
        self
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Decode the side payload back into key/value pairs.
    pub fn custom_fields(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.extra
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
    }
}
