//! Streaming Row Transformer.
//!
//! Built once per archive entry from its header row: every input column is
//! resolved to a slot up front, so per-row work is a single pass with no
//! name lookups.

use gtfsflow_core::row::Row;
use gtfsflow_core::schema::TableDef;
use serde_json::{Map, Value as Json};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// Recognized column at this index of `TableDef::columns`.
    Column(usize),
    /// Unrecognized column kept in the side payload.
    Custom(String),
    /// Unrecognized column on a table without custom field support.
    Discard,
}

#[derive(Debug, Clone)]
pub struct RowTransformer<'a> {
    def: &'a TableDef,
    slots: Vec<Slot>,
}

impl<'a> RowTransformer<'a> {
    /// Resolve `headers` against `def`. A leading byte-order mark and
    /// surrounding whitespace are stripped from header names.
    pub fn new<'h, I>(def: &'a TableDef, headers: I) -> Self
    where
        I: IntoIterator<Item = &'h str>,
    {
        let slots = headers
            .into_iter()
            .enumerate()
            .map(|(i, h)| {
                let name = if i == 0 { h.trim_start_matches('\u{feff}') } else { h }.trim();
                match def.index_of(name) {
                    Some(idx) => Slot::Column(idx),
                    None if def.custom_fields => Slot::Custom(name.to_string()),
                    None => Slot::Discard,
                }
            })
            .collect();
        Self { def, slots }
    }

    /// Header names that map to no recognized column.
    pub fn unrecognized(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots.iter().filter_map(|s| match s {
            Slot::Custom(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Convert one input record. Recognized columns go through their input
    /// converter; columns absent from the record stay NULL. Unrecognized
    /// columns, empty values included, are collected into the side payload
    /// when the table supports it. Fields beyond the header are ignored.
    pub fn to_row<'r, I>(&self, fields: I) -> Result<Row>
    where
        I: IntoIterator<Item = &'r str>,
    {
        let mut row = Row::nulls(self.def.columns.len());
        let mut extra = Map::new();
        for (slot, raw) in self.slots.iter().zip(fields) {
            match slot {
                Slot::Column(idx) => row.values[*idx] = self.def.columns[*idx].parse(raw),
                Slot::Custom(name) => {
                    extra.insert(name.clone(), Json::String(raw.to_string()));
                }
                Slot::Discard => {}
            }
        }
        if !extra.is_empty() {
            row.extra = Some(serde_json::to_string(&extra)?);
        }
        Ok(row)
    }
}

/// Output direction: one text field per recognized column, in declared
/// order. NULL becomes the empty field; non-null values go through the
/// column's output converter when it has one.
pub fn format_row(def: &TableDef, row: &Row) -> Vec<String> {
    def.columns
        .iter()
        .enumerate()
        .map(|(idx, col)| row.get(idx).map(|v| col.format(v)).unwrap_or_default())
        .collect()
}
