//! The Task contract and the values tasks hand back.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use gtfsflow_core::config::EngineConfig;
use gtfsflow_core::registry::Registry;
use gtfsflow_io::{ExportReport, ImportReport};
use gtfsflow_store::Store;
use serde::Serialize;

use crate::error::TaskError;

/// Handle passed to every task: the pipeline's store plus the settings it
/// runs under.
pub struct TaskContext<'a> {
    pub store: &'a Store,
    pub config: &'a EngineConfig,
    pub registry: &'a Registry,
}

/// One pipeline step.
///
/// Tasks may read and write the store freely, open their own transactions
/// and suspend integrity checking; the orchestrator wraps nothing around
/// `execute`.
pub trait Task {
    /// Identifier, unique within one pipeline.
    fn id(&self) -> &str;

    /// Whether a failure is logged and skipped instead of aborting the run.
    fn is_optional(&self) -> bool {
        false
    }

    fn execute(&mut self, ctx: &TaskContext<'_>) -> Result<Option<TaskOutput>, TaskError>;
}

/// Service id → dates on which it runs.
pub type ActiveServices = BTreeMap<String, Vec<NaiveDate>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TaskOutput {
    Import(ImportReport),
    Export(ExportReport),
    ActiveServices(ActiveServices),
    Json(serde_json::Value),
}

/// Results keyed by task id. Recording the same id twice keeps the later
/// value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TaskResults(BTreeMap<String, TaskOutput>);

impl TaskResults {
    pub fn insert(&mut self, id: impl Into<String>, output: TaskOutput) {
        self.0.insert(id.into(), output);
    }

    pub fn get(&self, id: &str) -> Option<&TaskOutput> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskOutput)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_inner(self) -> BTreeMap<String, TaskOutput> {
        self.0
    }
}

/// A task from a closure, for collaborators that need no state of their own.
pub struct FnTask<F> {
    id: String,
    optional: bool,
    f: F,
}

impl<F> FnTask<F>
where
    F: FnMut(&TaskContext<'_>) -> Result<Option<TaskOutput>, TaskError>,
{
    pub fn new(id: impl Into<String>, f: F) -> Self {
        Self {
            id: id.into(),
            optional: false,
            f,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

impl<F> Task for FnTask<F>
where
    F: FnMut(&TaskContext<'_>) -> Result<Option<TaskOutput>, TaskError>,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn is_optional(&self) -> bool {
        self.optional
    }

    fn execute(&mut self, ctx: &TaskContext<'_>) -> Result<Option<TaskOutput>, TaskError> {
        (self.f)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn later_result_for_same_id_wins() {
        let mut results = TaskResults::default();
        results.insert("stats", TaskOutput::Json(json!(1)));
        results.insert("stats", TaskOutput::Json(json!(2)));
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("stats"), Some(&TaskOutput::Json(json!(2))));
    }

    #[test]
    fn outputs_serialize_with_kind_tag() {
        let out = TaskOutput::Json(json!({"deleted": 3}));
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v, json!({"kind": "json", "value": {"deleted": 3}}));
    }
}
