#![forbid(unsafe_code)]
//! gtfsflow-exec: running tasks against a store.
//!
//! - `task`: the Task contract, its context and typed results.
//! - `pipeline`: the orchestrator and its run reports.
//! - `merge`: namespacing and folding several datasets into one store.
//! - `tasks`: built-in tasks (import, export, cleanup, routes, trips, services).
//! - `dsl`: YAML pipeline definitions.

pub mod dsl;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod task;
pub mod tasks;

pub use dsl::{parse_yaml_pipeline, Execution, PipelineDef};
pub use error::{ExecError, TaskError};
pub use merge::{MergeReport, Merger};
pub use pipeline::{Pipeline, RunReport, TaskOutcome, TaskTiming};
pub use task::{ActiveServices, FnTask, Task, TaskContext, TaskOutput, TaskResults};
