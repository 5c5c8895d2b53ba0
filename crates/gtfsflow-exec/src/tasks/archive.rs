//! Import and export as pipeline tasks.

use std::path::PathBuf;

use gtfsflow_io::{ExportOptions, Exporter, Importer};

use crate::error::TaskError;
use crate::task::{Task, TaskContext, TaskOutput};

#[derive(Debug, Clone)]
pub enum ImportSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// Load a GTFS archive into the pipeline store.
#[derive(Debug, Clone)]
pub struct ImportGtfs {
    source: ImportSource,
}

impl ImportGtfs {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ImportSource::Path(path.into()),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            source: ImportSource::Bytes(bytes),
        }
    }
}

impl Task for ImportGtfs {
    fn id(&self) -> &str {
        "import_gtfs"
    }

    fn execute(&mut self, ctx: &TaskContext<'_>) -> Result<Option<TaskOutput>, TaskError> {
        let importer = Importer::new(ctx.store, ctx.registry).with_batch_size(ctx.config.batch_size);
        let report = match &self.source {
            ImportSource::Path(path) => importer.import_path(path)?,
            ImportSource::Bytes(bytes) => importer.import_bytes(bytes)?,
        };
        Ok(Some(TaskOutput::Import(report)))
    }
}

/// Write the store out as a GTFS archive.
#[derive(Debug, Clone)]
pub struct ExportGtfs {
    path: PathBuf,
    options: ExportOptions,
}

impl ExportGtfs {
    pub fn new(path: impl Into<PathBuf>, options: ExportOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }
}

impl Task for ExportGtfs {
    fn id(&self) -> &str {
        "export_gtfs"
    }

    fn execute(&mut self, ctx: &TaskContext<'_>) -> Result<Option<TaskOutput>, TaskError> {
        let report = Exporter::new(ctx.store, ctx.registry).export_to_path(&self.path, &self.options)?;
        Ok(Some(TaskOutput::Export(report)))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use gtfsflow_store::Store;
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::tasks::testing::run;

    fn archive() -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("calendar.txt", SimpleFileOptions::default()).unwrap();
        zip.write_all(
            b"service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
              WK,1,1,1,1,1,0,0,20240101,20241231\n",
        )
        .unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn import_then_export_to_path() {
        let store = Store::in_memory().unwrap();
        let out = run(&mut ImportGtfs::from_bytes(archive()), &store).unwrap();
        let Some(TaskOutput::Import(report)) = out else {
            panic!("expected an import report");
        };
        assert_eq!(report.rows_inserted(), 1);

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("feed.zip");
        let out = run(&mut ExportGtfs::new(&dest, ExportOptions::default()), &store).unwrap();
        let Some(TaskOutput::Export(report)) = out else {
            panic!("expected an export report");
        };
        assert_eq!(report.rows("calendar.txt"), Some(1));
        assert!(report.feed_info);
        assert!(dest.exists());
    }

    #[test]
    fn missing_input_fails() {
        let store = Store::in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = run(&mut ImportGtfs::from_path(dir.path().join("nope.zip")), &store).unwrap_err();
        assert!(matches!(err, TaskError::Io(_)), "{err}");
        assert!(!err.suggestions().is_empty());
    }
}
