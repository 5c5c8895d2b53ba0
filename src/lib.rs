#![forbid(unsafe_code)]
//! gtfsflow: a pipeline engine for GTFS feeds.
//!
//! Feeds are imported into an embedded SQLite store, rewritten by an ordered
//! list of tasks and exported back to GTFS archives. Several datasets can be
//! namespaced and merged into one store before export.
//!
//! - [`core`]: data dictionary, rows, values, batches and configuration.
//! - [`store`]: the SQLite store, batch inserts and integrity suspension.
//! - [`io`]: streaming import and atomic export of GTFS archives.
//! - [`exec`]: tasks, the orchestrator, the merger and YAML pipelines.

pub use gtfsflow_core as core;
pub use gtfsflow_exec as exec;
pub use gtfsflow_io as io;
pub use gtfsflow_store as store;

pub use gtfsflow_core::config::EngineConfig;
pub use gtfsflow_core::registry::Registry;
pub use gtfsflow_exec::{Merger, Pipeline, PipelineDef, Task, TaskContext, TaskOutput};
pub use gtfsflow_io::{ExportOptions, ExportScope, Exporter, Importer};
pub use gtfsflow_store::Store;
