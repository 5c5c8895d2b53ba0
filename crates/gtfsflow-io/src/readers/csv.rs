//! Pull-based CSV reader producing transformed rows.
//!
//! Nothing is read ahead of the caller: the next record is parsed only when
//! `next_row` is called, so a caller that stops pulling while it commits a
//! batch pauses the parser.

use std::io::Read;

use csv as csv_crate;
use gtfsflow_core::row::Row;
use gtfsflow_core::schema::TableDef;

use crate::error::{Error, Result};
use crate::transform::RowTransformer;

pub struct CsvRowReader<'a, R: Read> {
    rdr: csv_crate::Reader<R>,
    record: csv_crate::StringRecord,
    transformer: RowTransformer<'a>,
    file: String,
    rows_read: u64,
}

impl<'a, R: Read> CsvRowReader<'a, R> {
    /// Read the header row of `reader` and resolve it against `def`.
    /// `file` names the source in parse errors.
    pub fn new(reader: R, def: &'a TableDef, file: &str) -> Result<Self> {
        let mut rdr = csv_crate::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let transformer = {
            let headers = rdr.headers().map_err(|e| Error::parse(file, e))?;
            RowTransformer::new(def, headers.iter())
        };
        Ok(Self {
            rdr,
            record: csv_crate::StringRecord::new(),
            transformer,
            file: file.to_string(),
            rows_read: 0,
        })
    }

    pub fn transformer(&self) -> &RowTransformer<'a> {
        &self.transformer
    }

    /// Parse the next record, or `None` at end of input.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        match self.rdr.read_record(&mut self.record) {
            Ok(false) => Ok(None),
            Ok(true) => {
                self.rows_read += 1;
                self.transformer.to_row(self.record.iter()).map(Some)
            }
            Err(e) => Err(Error::parse(&self.file, e)),
        }
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }
}
