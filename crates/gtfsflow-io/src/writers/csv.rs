//! Streaming CSV writer for one table.

use std::io::Write;

use csv as csv_crate;
use gtfsflow_core::row::Row;
use gtfsflow_core::schema::TableDef;
use serde_json::Value as Json;

use crate::error::Result;
use crate::transform::format_row;

pub struct CsvRowWriter<'a, W: Write> {
    wtr: csv_crate::Writer<W>,
    def: &'a TableDef,
    custom: Vec<String>,
    rows: u64,
}

impl<'a, W: Write> CsvRowWriter<'a, W> {
    /// Write the header row (recognized columns in declared order).
    pub fn new(writer: W, def: &'a TableDef) -> Result<Self> {
        Self::with_custom_fields(writer, def, Vec::new())
    }

    /// Like [`CsvRowWriter::new`], with `custom` appended to the header.
    /// Each row's side payload fills those columns; missing keys are empty.
    pub fn with_custom_fields(writer: W, def: &'a TableDef, custom: Vec<String>) -> Result<Self> {
        let mut wtr = csv_crate::Writer::from_writer(writer);
        let mut header: Vec<&str> = def.column_names().collect();
        header.extend(custom.iter().map(String::as_str));
        wtr.write_record(&header)?;
        Ok(Self {
            wtr,
            def,
            custom,
            rows: 0,
        })
    }

    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        let mut record = format_row(self.def, row);
        if !self.custom.is_empty() {
            let extra = row.custom_fields().unwrap_or_default();
            record.extend(self.custom.iter().map(|key| match extra.get(key) {
                Some(Json::String(s)) => s.clone(),
                Some(Json::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }));
        }
        self.wtr.write_record(record)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush buffered records. Returns the number of data rows written.
    pub fn finish(mut self) -> Result<u64> {
        self.wtr.flush()?;
        Ok(self.rows)
    }
}
