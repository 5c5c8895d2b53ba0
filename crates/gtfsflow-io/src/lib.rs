#![forbid(unsafe_code)]
//! gtfsflow-io: moving feeds between zip archives and the store.
//!
//! - `transform`: per-entry header resolution and row conversion.
//! - `readers` / `writers`: pull-based CSV rows, atomic output files.
//! - `import`: the streaming importer.
//! - `export`: the streaming exporter, with `scope` and `feed_info`.

pub mod error;
pub mod export;
pub mod feed_info;
pub mod import;
pub mod readers;
pub mod scope;
pub mod transform;
pub mod writers;

pub use error::{Error, Result};
pub use export::{ExportOptions, ExportReport, Exporter, TableExport};
pub use feed_info::{FeedInfo, FeedInfoConfig};
pub use import::{ImportReport, Importer, TableImport};
pub use scope::ExportScope;
pub use transform::RowTransformer;
