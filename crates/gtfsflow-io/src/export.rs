//! Streaming Exporter: store → zip archive of delimited text.
//!
//! Tables are visited in registry order. Empty (or fully scoped-out) tables
//! produce no entry. Rows stream straight from the table scan through the
//! CSV writer into the compressed entry, so nothing larger than one row is
//! held in memory. Side payloads are expanded back into trailing columns,
//! one per key seen in the exported rows. Path exports go through an [`AtomicFile`]: the
//! destination only appears once the archive is complete.

use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use gtfsflow_core::feed::FEED_INFO_FILE;
use gtfsflow_core::registry::Registry;
use gtfsflow_core::schema::{TableDef, EXTRA_FIELDS_COLUMN};
use gtfsflow_store::{Filter, Store};
use rusqlite::params_from_iter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::feed_info::{FeedInfo, FeedInfoConfig};
use crate::scope::ExportScope;
use crate::writers::atomic::AtomicFile;
use crate::writers::csv::CsvRowWriter;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub scope: ExportScope,
    pub feed_info: FeedInfoConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableExport {
    pub file_name: String,
    pub rows: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
    /// Destination, for path exports.
    pub path: Option<PathBuf>,
    pub tables: Vec<TableExport>,
    pub feed_info: bool,
}

impl ExportReport {
    pub fn rows(&self, file_name: &str) -> Option<u64> {
        self.tables
            .iter()
            .find(|t| t.file_name == file_name)
            .map(|t| t.rows)
    }
}

pub struct Exporter<'a> {
    store: &'a Store,
    registry: &'a Registry,
}

impl<'a> Exporter<'a> {
    pub fn new(store: &'a Store, registry: &'a Registry) -> Self {
        Self { store, registry }
    }

    /// Write the archive to `dest` atomically. On failure the destination
    /// is left as it was and the temporary file is removed.
    pub fn export_to_path(&self, dest: &Path, opts: &ExportOptions) -> Result<ExportReport> {
        let ctx = |e: Error| e.with_context(dest.display().to_string());
        let mut out = AtomicFile::create(dest).map_err(ctx)?;
        debug!(tmp = %out.temp_path().display(), "writing archive");
        let mut report = self.write_archive(&mut out, opts).map_err(ctx)?;
        out.commit().map_err(ctx)?;
        report.path = Some(dest.to_path_buf());
        info!(
            path = %dest.display(),
            entries = report.tables.len(),
            feed_info = report.feed_info,
            "archive exported"
        );
        Ok(report)
    }

    pub fn export_to_bytes(&self, opts: &ExportOptions) -> Result<(Vec<u8>, ExportReport)> {
        let mut buf = Cursor::new(Vec::new());
        let report = self.write_archive(&mut buf, opts)?;
        Ok((buf.into_inner(), report))
    }

    pub fn write_archive<W: Write + Seek>(&self, writer: W, opts: &ExportOptions) -> Result<ExportReport> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut report = ExportReport::default();

        for def in self.registry.iter() {
            let filter = opts.scope.filter(def.table);
            if self.store.count_where(def.table, &filter)? == 0 {
                debug!(table = def.table, "empty, no entry written");
                continue;
            }
            let custom = if def.custom_fields {
                custom_field_names(self.store, def, &filter)?
            } else {
                Vec::new()
            };
            zip.start_file(def.file_name, options)?;
            let mut rows = CsvRowWriter::with_custom_fields(&mut zip, def, custom)?;
            self.store
                .scan(def, &filter, |row| rows.write_row(&row))
                .map_err(|e: Error| e.with_context(def.file_name))?;
            let written = rows.finish()?;
            debug!(file = def.file_name, rows = written, "entry written");
            report.tables.push(TableExport {
                file_name: def.file_name.to_string(),
                rows: written,
            });
        }

        if let Some(info) = FeedInfo::from_calendar(self.store, &opts.scope.filter("calendar"))? {
            zip.start_file(FEED_INFO_FILE, options)?;
            info.write(&opts.feed_info, &mut zip)?;
            report.feed_info = true;
        }

        zip.finish()?;
        Ok(report)
    }
}

/// Keys present in the side payloads of the rows selected by `filter`,
/// sorted. They are written back as extra columns so that a re-import
/// restores the same payloads.
fn custom_field_names(store: &Store, def: &TableDef, filter: &Filter) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT DISTINCT j.key FROM (SELECT {EXTRA_FIELDS_COLUMN} AS side FROM {}{}) s, json_each(s.side) j \
         WHERE s.side IS NOT NULL ORDER BY j.key",
        def.table,
        filter.sql()
    );
    let conn = store.conn();
    let mut stmt = conn.prepare(&sql).map_err(gtfsflow_store::Error::from)?;
    let names = stmt
        .query_map(params_from_iter(filter.bind()), |r| r.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(gtfsflow_store::Error::from)?;
    Ok(names)
}
