//! Task Orchestrator.
//!
//! A `Pipeline` owns one store and an ordered list of tasks. `run` executes
//! each task once, in order, and times it. A failing optional task is logged
//! and skipped; any other failure aborts the run. Nothing is rolled back:
//! mutations made by completed tasks stay in the store.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use gtfsflow_core::config::EngineConfig;
use gtfsflow_core::registry::Registry;
use gtfsflow_store::Store;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ExecError;
use crate::task::{Task, TaskContext, TaskResults};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed,
    /// Optional task failed; the message is the swallowed error.
    SkippedAfterFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskTiming {
    pub id: String,
    /// Zero-based position in the pipeline.
    pub index: usize,
    pub duration: Duration,
    pub outcome: TaskOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Stable digest of the ordered task list.
    pub pipeline_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub tasks: Vec<TaskTiming>,
    pub results: TaskResults,
}

struct Step {
    task: Box<dyn Task>,
    optional: bool,
}

pub struct Pipeline {
    store: Store,
    config: EngineConfig,
    registry: Registry,
    agency: Option<String>,
    steps: Vec<Step>,
}

impl Pipeline {
    /// Pipeline over a fresh in-memory store.
    pub fn new(config: EngineConfig) -> Result<Self, ExecError> {
        config.validate()?;
        let store = Store::open_in_memory(&config.store)?;
        Ok(Self::with_store(store, config))
    }

    /// Pipeline over an existing store.
    pub fn with_store(store: Store, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            registry: Registry::gtfs(),
            agency: None,
            steps: Vec::new(),
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_task(mut self, task: impl Task + 'static) -> Self {
        let optional = task.is_optional();
        self.steps.push(Step {
            task: Box::new(task),
            optional,
        });
        self
    }

    /// Add a task whose failure does not abort the run.
    pub fn with_optional_task(mut self, task: impl Task + 'static) -> Self {
        self.steps.push(Step {
            task: Box::new(task),
            optional: true,
        });
        self
    }

    pub fn with_boxed_task(mut self, task: Box<dyn Task>, optional: bool) -> Self {
        let optional = optional || task.is_optional();
        self.steps.push(Step { task, optional });
        self
    }

    /// Agency this dataset belongs to, used as its prefix when merged.
    pub fn with_agency(mut self, agency: impl Into<String>) -> Self {
        self.agency = Some(agency.into());
        self
    }

    pub fn agency(&self) -> Option<&str> {
        self.agency.as_deref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    /// `(id, optional)` per task, in run order.
    pub fn tasks(&self) -> Vec<(&str, bool)> {
        self.steps
            .iter()
            .map(|s| (s.task.id(), s.optional))
            .collect()
    }

    /// blake3 over the task list. Every id is length-prefixed, so ids that
    /// contain NUL or look like another id's trailer cannot alias a
    /// different list.
    pub fn pipeline_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (id, optional) in self.tasks() {
            hasher.update(&(id.len() as u64).to_le_bytes());
            hasher.update(id.as_bytes());
            hasher.update(&[u8::from(optional)]);
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Execute every task in order.
    ///
    /// # Errors
    ///
    /// [`ExecError::TaskFailed`] for the first required task that fails,
    /// carrying the results recorded so far. Later tasks do not run.
    pub fn run(&mut self) -> Result<RunReport, ExecError> {
        let run_id = Uuid::new_v4();
        let pipeline_hash = self.pipeline_hash();
        let started_at = Utc::now();
        let clock = Instant::now();
        let total = self.steps.len();
        info!(%run_id, tasks = total, "pipeline started");

        let ctx = TaskContext {
            store: &self.store,
            config: &self.config,
            registry: &self.registry,
        };
        let mut results = TaskResults::default();
        let mut timings = Vec::with_capacity(total);

        for (index, step) in self.steps.iter_mut().enumerate() {
            let id = step.task.id().to_string();
            info!(task = %id, n = index + 1, of = total, "running");
            let task_clock = Instant::now();
            let outcome = step.task.execute(&ctx);
            let duration = task_clock.elapsed();

            match outcome {
                Ok(output) => {
                    info!(task = %id, elapsed_ms = duration.as_millis() as u64, "completed");
                    if let Some(output) = output {
                        results.insert(id.clone(), output);
                    }
                    timings.push(TaskTiming {
                        id,
                        index,
                        duration,
                        outcome: TaskOutcome::Completed,
                    });
                }
                Err(e) if step.optional => {
                    warn!(task = %id, error = %e, "optional task failed, continuing");
                    timings.push(TaskTiming {
                        id,
                        index,
                        duration,
                        outcome: TaskOutcome::SkippedAfterFailure(e.to_string()),
                    });
                }
                Err(e) => {
                    warn!(task = %id, error = %e, "task failed, aborting pipeline");
                    return Err(ExecError::TaskFailed {
                        id,
                        index,
                        source: e,
                        completed: results,
                    });
                }
            }
        }

        let duration = clock.elapsed();
        info!(%run_id, elapsed_ms = duration.as_millis() as u64, "all tasks completed");
        Ok(RunReport {
            run_id,
            pipeline_hash,
            started_at,
            finished_at: Utc::now(),
            duration,
            tasks: timings,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::task::{FnTask, TaskOutput};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn pipeline() -> Pipeline {
        Pipeline::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn tasks_run_in_order_and_record_results() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (seen.clone(), seen.clone());
        let mut p = pipeline()
            .with_task(FnTask::new("first", move |_: &TaskContext<'_>| {
                a.borrow_mut().push("first");
                Ok(Some(TaskOutput::Json(json!(1))))
            }))
            .with_task(FnTask::new("second", move |_: &TaskContext<'_>| {
                b.borrow_mut().push("second");
                Ok(None)
            }));
        let report = p.run().unwrap();
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
        assert_eq!(report.tasks.len(), 2);
        assert_eq!(report.tasks[1].index, 1);
        assert!(report.results.contains("first"));
        assert!(!report.results.contains("second"));
    }

    #[test]
    fn optional_failure_is_skipped() {
        let mut p = pipeline()
            .with_optional_task(FnTask::new("flaky", |_: &TaskContext<'_>| {
                Err(TaskError::msg("network down"))
            }))
            .with_task(FnTask::new("after", |_: &TaskContext<'_>| {
                Ok(Some(TaskOutput::Json(json!("ok"))))
            }));
        let report = p.run().unwrap();
        assert_eq!(
            report.tasks[0].outcome,
            TaskOutcome::SkippedAfterFailure("network down".into())
        );
        assert!(!report.results.contains("flaky"));
        assert!(report.results.contains("after"));
    }

    #[test]
    fn required_failure_aborts_with_partial_results() {
        let mut p = pipeline()
            .with_task(FnTask::new("load", |_: &TaskContext<'_>| {
                Ok(Some(TaskOutput::Json(json!("loaded"))))
            }))
            .with_task(FnTask::new("break", |_: &TaskContext<'_>| Err(TaskError::msg("bad data"))))
            .with_task(FnTask::new("never", |_: &TaskContext<'_>| {
                panic!("must not run after an abort")
            }));
        match p.run() {
            Err(ExecError::TaskFailed { id, index, completed, .. }) => {
                assert_eq!(id, "break");
                assert_eq!(index, 1);
                assert!(completed.contains("load"));
            }
            other => panic!("expected TaskFailed, got {other:?}"),
        }
    }

    #[test]
    fn timings_cover_task_durations() {
        let mut p = pipeline().with_task(FnTask::new("sleep", |_: &TaskContext<'_>| {
            std::thread::sleep(Duration::from_millis(20));
            Ok(None)
        }));
        let report = p.run().unwrap();
        assert!(report.tasks[0].duration >= Duration::from_millis(20));
        assert!(report.duration >= report.tasks[0].duration);
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn hash_depends_on_ids_and_optionality() {
        let noop = |_: &TaskContext<'_>| -> Result<Option<TaskOutput>, TaskError> { Ok(None) };
        let a = pipeline().with_task(FnTask::new("x", noop));
        let b = pipeline().with_task(FnTask::new("x", noop));
        let c = pipeline().with_optional_task(FnTask::new("x", noop));
        assert_eq!(a.pipeline_hash(), b.pipeline_hash());
        assert_ne!(a.pipeline_hash(), c.pipeline_hash());
    }

    #[test]
    fn hash_separates_ids_containing_nul() {
        let noop = |_: &TaskContext<'_>| -> Result<Option<TaskOutput>, TaskError> { Ok(None) };
        let two = pipeline()
            .with_task(FnTask::new("a", noop))
            .with_task(FnTask::new("b", noop));
        let one = pipeline().with_task(FnTask::new("a\0\0b", noop));
        assert_ne!(two.pipeline_hash(), one.pipeline_hash());
    }
}
