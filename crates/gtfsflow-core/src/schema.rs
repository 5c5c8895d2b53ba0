//! Table definitions: the static binding between one archive file and one
//! relational table. Pure data; converters are plain function pointers.
//!
//! Column order is part of the contract. It drives the generated insert
//! statement, the select list on export and the header of every output file.

use std::fmt;

use crate::value::Value;

/// Reserved column holding unrecognized input columns as a JSON object.
pub const EXTRA_FIELDS_COLUMN: &str = "extra_fields_json";

/// Text → typed value, applied on import.
pub type InputFn = fn(&str) -> Value;

/// Typed value → text, applied on export to non-null values only.
pub type OutputFn = fn(&Value) -> String;

#[derive(Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub input: Option<InputFn>,
    pub output: Option<OutputFn>,
}

impl ColumnDef {
    /// Column passed through verbatim in both directions.
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            input: None,
            output: None,
        }
    }

    pub const fn parsed(name: &'static str, input: InputFn) -> Self {
        Self {
            name,
            input: Some(input),
            output: None,
        }
    }

    pub const fn converted(name: &'static str, input: InputFn, output: OutputFn) -> Self {
        Self {
            name,
            input: Some(input),
            output: Some(output),
        }
    }

    /// Apply the input converter, or keep the raw text when none is declared.
    pub fn parse(&self, raw: &str) -> Value {
        match self.input {
            Some(convert) => convert(raw),
            None => Value::Text(raw.to_string()),
        }
    }

    /// Apply the output converter to non-null values.
    pub fn format(&self, value: &Value) -> String {
        match (self.output, value) {
            (_, Value::Null) => String::new(),
            (Some(convert), v) => convert(v),
            (None, v) => v.render(),
        }
    }
}

impl fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("name", &self.name)
            .field("input", &self.input.is_some())
            .field("output", &self.output.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct TableDef {
    /// Entry name inside the archive, e.g. `stops.txt`.
    pub file_name: &'static str,
    /// Relational table name.
    pub table: &'static str,
    pub columns: &'static [ColumnDef],
    /// Whether unrecognized columns are kept in [`EXTRA_FIELDS_COLUMN`].
    pub custom_fields: bool,
}

impl TableDef {
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Columns as stored: the recognized ones, then the side column when
    /// custom fields are supported.
    pub fn storage_columns(&self) -> Vec<&'static str> {
        let mut cols: Vec<&'static str> = self.column_names().collect();
        if self.custom_fields {
            cols.push(EXTRA_FIELDS_COLUMN);
        }
        cols
    }
}
