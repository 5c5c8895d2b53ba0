//! Orchestration error types.

use thiserror::Error;

use crate::task::TaskResults;

/// What a task reports when it fails.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Io(#[from] gtfsflow_io::Error),

    #[error(transparent)]
    Store(#[from] gtfsflow_store::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Message(String),

    /// Anything else a collaborator task wants to surface.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    pub fn msg(message: impl Into<String>) -> Self {
        TaskError::Message(message.into())
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            TaskError::Io(e) => e.suggestions(),
            TaskError::Store(e) if e.is_constraint() => {
                vec!["a referenced identifier is missing from the feed".into()]
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    /// A required task failed. `completed` holds the results recorded by the
    /// tasks that ran before it; their store mutations are not rolled back.
    #[error("task '{id}' (#{}) failed: {source}", .index + 1)]
    TaskFailed {
        id: String,
        index: usize,
        #[source]
        source: TaskError,
        completed: TaskResults,
    },

    #[error("merging dataset '{prefix}' failed: {source}")]
    Merge {
        prefix: String,
        #[source]
        source: TaskError,
    },

    #[error("pipeline definition: {0}")]
    Dsl(String),

    #[error(transparent)]
    Config(#[from] gtfsflow_core::error::Error),

    #[error(transparent)]
    Store(#[from] gtfsflow_store::Error),
}

impl ExecError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ExecError::TaskFailed { source, .. } | ExecError::Merge { source, .. } => {
                source.suggestions()
            }
            ExecError::Dsl(msg) if msg.contains("unknown variant") => vec![
                "supported ops: drop_unused_entities, fix_sequences, merge_routes, generate_route_long_names, generate_stable_trip_ids, active_services".into(),
            ],
            ExecError::Config(e) => e.suggestions(),
            _ => Vec::new(),
        }
    }
}
