//! Streaming Importer: zip archive of delimited text → store.
//!
//! Entries are handled one at a time in archive order. Each matched entry
//! is parsed row by row into a bounded [`Batch`]; when the batch fills, the
//! reader is not pulled again until the batch is committed, so memory stays
//! at one batch no matter how large the entry is. Foreign-key enforcement is
//! suspended for the whole archive and restored on every exit path.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use gtfsflow_core::batch::{Batch, DEFAULT_BATCH_SIZE};
use gtfsflow_core::registry::Registry;
use gtfsflow_core::schema::TableDef;
use gtfsflow_store::{BatchInserter, Store};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::readers::csv::CsvRowReader;

/// Outcome of importing one archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableImport {
    pub file_name: String,
    pub table: String,
    pub rows_read: u64,
    /// Rows actually written; duplicates of existing keys are not counted.
    pub rows_inserted: u64,
    pub batches: usize,
    /// Rows per committed batch: every batch is full except possibly the last.
    pub batch_sizes: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub tables: Vec<TableImport>,
    /// Entries with no registered table definition.
    pub skipped: Vec<String>,
}

impl ImportReport {
    pub fn table(&self, table: &str) -> Option<&TableImport> {
        self.tables.iter().find(|t| t.table == table)
    }

    pub fn rows_inserted(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_inserted).sum()
    }
}

pub struct Importer<'a> {
    store: &'a Store,
    registry: &'a Registry,
    batch_size: usize,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a Store, registry: &'a Registry) -> Self {
        Self {
            store,
            registry,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Rows per transaction. Clamped to at least one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn import_path(&self, path: &Path) -> Result<ImportReport> {
        let ctx = |e: Error| e.with_context(path.display().to_string());
        let file = File::open(path).map_err(|e| ctx(e.into()))?;
        self.import_reader(BufReader::new(file)).map_err(ctx)
    }

    pub fn import_bytes(&self, bytes: &[u8]) -> Result<ImportReport> {
        self.import_reader(Cursor::new(bytes))
    }

    pub fn import_reader<R: Read + Seek>(&self, reader: R) -> Result<ImportReport> {
        let mut archive = ZipArchive::new(reader)?;
        let guard = self.store.suspend_integrity()?;
        let mut report = ImportReport::default();

        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let Some(def) = self.registry.by_file_name(&name) else {
                debug!(entry = %name, "no table definition, skipping");
                report.skipped.push(name);
                continue;
            };
            let table = self
                .import_entry(entry, def, &name)
                .map_err(|e| e.with_context(name.clone()))?;
            info!(
                file = %table.file_name,
                rows = table.rows_read,
                inserted = table.rows_inserted,
                batches = table.batches,
                "imported"
            );
            report.tables.push(table);
        }

        guard.restore()?;
        info!(
            entries = report.tables.len(),
            skipped = report.skipped.len(),
            rows = report.rows_inserted(),
            "archive imported"
        );
        Ok(report)
    }

    fn import_entry<R: Read>(&self, entry: R, def: &TableDef, name: &str) -> Result<TableImport> {
        let mut reader = CsvRowReader::new(entry, def, name)?;
        let custom: Vec<&str> = reader.transformer().unrecognized().collect();
        if !custom.is_empty() {
            debug!(file = name, columns = ?custom, "unrecognized columns kept as custom fields");
        }
        let mut inserter = BatchInserter::new(self.store, def);
        let mut batch = Batch::with_capacity(self.batch_size);

        while let Some(row) = reader.next_row()? {
            if batch.push(row) {
                inserter.commit(batch.rows())?;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            inserter.commit(batch.rows())?;
        }

        Ok(TableImport {
            file_name: name.to_string(),
            table: def.table.to_string(),
            rows_read: reader.rows_read(),
            rows_inserted: inserter.rows_written(),
            batches: inserter.batches(),
            batch_sizes: inserter.batch_sizes().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn batches_follow_configured_size() {
        let mut body = String::from("shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\n");
        for i in 0..7 {
            body.push_str(&format!("SH1,52.{i},21.{i},{i}\n"));
        }
        let store = Store::in_memory().unwrap();
        let registry = Registry::gtfs();
        let report = Importer::new(&store, &registry)
            .with_batch_size(3)
            .import_bytes(&archive(&[("shapes.txt", &body)]))
            .unwrap();

        let shapes = report.table("shapes").unwrap();
        assert_eq!(shapes.rows_read, 7);
        assert_eq!(shapes.rows_inserted, 7);
        assert_eq!(shapes.batches, 3);
        assert_eq!(shapes.batch_sizes, vec![3, 3, 1]);
        assert_eq!(store.count("shapes").unwrap(), 7);
    }

    #[test]
    fn unknown_entries_and_directories_are_skipped() {
        let store = Store::in_memory().unwrap();
        let registry = Registry::gtfs();
        let bytes = archive(&[
            ("docs/", ""),
            ("README.md", "hello"),
            ("agency.txt", "agency_id,agency_name,agency_url,agency_timezone\nA,Agency,https://a.example,UTC\n"),
        ]);
        let report = Importer::new(&store, &registry).import_bytes(&bytes).unwrap();
        assert_eq!(report.skipped, vec!["README.md".to_string()]);
        assert_eq!(report.tables.len(), 1);
        assert_eq!(store.count("agency").unwrap(), 1);
    }

    #[test]
    fn dangling_references_import_and_checks_come_back() {
        let store = Store::in_memory().unwrap();
        let registry = Registry::gtfs();
        // Child before parent, parent missing entirely.
        let bytes = archive(&[(
            "trips.txt",
            "route_id,service_id,trip_id\nR1,WK,T1\n",
        )]);
        Importer::new(&store, &registry).import_bytes(&bytes).unwrap();
        assert_eq!(store.count("trips").unwrap(), 1);
        assert!(store.foreign_keys_enabled().unwrap());
    }

    #[test]
    fn parse_failure_names_entry_and_restores_checks() {
        let store = Store::in_memory().unwrap();
        let registry = Registry::gtfs();
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("stops.txt", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"stop_id,stop_name\nS1,\xff\xfe\n").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = Importer::new(&store, &registry).import_bytes(&bytes).unwrap_err();
        assert!(err.to_string().starts_with("stops.txt: parse error"), "{err}");
        assert!(store.foreign_keys_enabled().unwrap());
    }

    #[test]
    fn not_a_zip_is_an_error() {
        let store = Store::in_memory().unwrap();
        let registry = Registry::gtfs();
        let err = Importer::new(&store, &registry).import_bytes(b"not a zip").unwrap_err();
        assert!(matches!(err, Error::Zip(_)));
    }
}
