//! YAML pipeline definitions.
//!
//! Example:
//! ```yaml
//! batch_size: 50000
//! datasets:
//!   - input: feeds/a.zip
//!     agency: A
//!     steps:
//!       - op: fix_sequences
//!       - op: drop_unused_entities
//!         optional: true
//!   - input: feeds/b.zip
//!     agency: B
//! output:
//!   path: out/feed.zip
//!   agency: A
//! ```
//!
//! One dataset runs as a single pipeline: import, steps, export. Several
//! datasets each run their own pipeline, are merged into one store, and that
//! store is exported.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use gtfsflow_core::config::EngineConfig;
use gtfsflow_io::{ExportOptions, ExportScope, FeedInfoConfig};
use serde::{Deserialize, Serialize};

use crate::error::ExecError;
use crate::merge::{MergeReport, Merger};
use crate::pipeline::{Pipeline, RunReport};
use crate::tasks::{ExportGtfs, ImportGtfs, Op};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDef {
    #[serde(flatten)]
    pub op: Op,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetDef {
    pub input: PathBuf,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputDef {
    pub path: PathBuf,
    /// Export only what this agency reaches.
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub feed_info: FeedInfoConfig,
}

impl OutputDef {
    fn options(&self) -> ExportOptions {
        ExportOptions {
            scope: self
                .agency
                .clone()
                .map_or(ExportScope::All, ExportScope::Agency),
            feed_info: self.feed_info.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDef {
    #[serde(default)]
    pub batch_size: Option<usize>,
    pub datasets: Vec<DatasetDef>,
    #[serde(default)]
    pub output: Option<OutputDef>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Execution {
    Single { run: RunReport },
    Merged { merge: MergeReport, export: Option<RunReport> },
}

/// Parse and validate a pipeline definition.
pub fn parse_yaml_pipeline(src: &str) -> Result<PipelineDef, ExecError> {
    let def: PipelineDef = serde_yaml::from_str(src).map_err(|e| ExecError::Dsl(e.to_string()))?;
    def.validate()?;
    Ok(def)
}

impl PipelineDef {
    pub fn from_path(path: &Path) -> Result<Self, ExecError> {
        let src = std::fs::read_to_string(path)
            .map_err(|e| ExecError::Dsl(format!("{}: {e}", path.display())))?;
        parse_yaml_pipeline(&src)
    }

    pub fn validate(&self) -> Result<(), ExecError> {
        if self.datasets.is_empty() {
            return Err(ExecError::Dsl("at least one dataset is required".into()));
        }
        if self.batch_size == Some(0) {
            return Err(ExecError::Dsl("batch_size must be greater than zero".into()));
        }
        let mut prefixes = BTreeSet::new();
        for (i, ds) in self.datasets.iter().enumerate() {
            if ds.input.as_os_str().is_empty() {
                return Err(ExecError::Dsl(format!("datasets[{i}]: input path is empty")));
            }
            if let Some(agency) = &ds.agency {
                if agency.is_empty() {
                    return Err(ExecError::Dsl(format!("datasets[{i}]: agency is empty")));
                }
                if !prefixes.insert(agency.as_str()) {
                    return Err(ExecError::Dsl(format!(
                        "datasets[{i}]: agency '{agency}' is used by another dataset"
                    )));
                }
            }
        }
        if let Some(out) = &self.output {
            if out.path.as_os_str().is_empty() {
                return Err(ExecError::Dsl("output: path is empty".into()));
            }
        }
        Ok(())
    }

    /// `base` with this definition's overrides applied.
    pub fn engine_config(&self, base: &EngineConfig) -> EngineConfig {
        let mut cfg = base.clone();
        if let Some(n) = self.batch_size {
            cfg.batch_size = n;
        }
        cfg
    }

    /// Human-readable plan, one line per step.
    pub fn explain(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let merged = self.datasets.len() > 1;
        for (i, ds) in self.datasets.iter().enumerate() {
            let agency = ds
                .agency
                .as_deref()
                .map(|a| format!(" (agency {a})"))
                .unwrap_or_default();
            lines.push(format!("dataset {}{agency}: {}", i + 1, ds.input.display()));
            lines.push("  1. import_gtfs".into());
            for (n, step) in ds.steps.iter().enumerate() {
                let optional = if step.optional { " (optional)" } else { "" };
                lines.push(format!("  {}. {}{optional}", n + 2, step.op.id()));
            }
        }
        if merged {
            lines.push(format!("merge {} datasets", self.datasets.len()));
        }
        if let Some(out) = &self.output {
            let scope = out
                .agency
                .as_deref()
                .map(|a| format!(" (agency {a})"))
                .unwrap_or_default();
            lines.push(format!("export_gtfs {}{scope}", out.path.display()));
        }
        lines
    }

    /// One pipeline per dataset. A lone dataset also gets the export step.
    pub fn build(&self, base: &EngineConfig) -> Result<Vec<Pipeline>, ExecError> {
        let config = self.engine_config(base);
        let single = self.datasets.len() == 1;
        let mut pipelines = Vec::with_capacity(self.datasets.len());
        for ds in &self.datasets {
            let mut p = Pipeline::new(config.clone())?.with_task(ImportGtfs::from_path(&ds.input));
            for step in &ds.steps {
                p = p.with_boxed_task(step.op.clone().into_task(), step.optional);
            }
            if let Some(agency) = &ds.agency {
                p = p.with_agency(agency.clone());
            }
            if let (true, Some(out)) = (single, &self.output) {
                p = p.with_task(ExportGtfs::new(&out.path, out.options()));
            }
            pipelines.push(p);
        }
        Ok(pipelines)
    }

    pub fn execute(&self, base: &EngineConfig) -> Result<Execution, ExecError> {
        let config = self.engine_config(base);
        let mut pipelines = self.build(&config)?;
        if pipelines.len() == 1 {
            let mut p = pipelines.remove(0);
            return Ok(Execution::Single { run: p.run()? });
        }

        let mut merger = Merger::new(config.clone())?;
        let merge = merger.merge_pipelines(pipelines)?;
        let export = match &self.output {
            Some(out) => {
                let mut p = Pipeline::with_store(merger.into_target(), config)
                    .with_task(ExportGtfs::new(&out.path, out.options()));
                Some(p.run()?)
            }
            None => None,
        };
        Ok(Execution::Merged { merge, export })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO: &str = "
batch_size: 1000
datasets:
  - input: feeds/a.zip
    agency: A
    steps:
      - op: fix_sequences
      - op: drop_unused_entities
        optional: true
  - input: feeds/b.zip
output:
  path: out/feed.zip
  agency: A
  feed_info:
    publisher_name: Transit Data
";

    #[test]
    fn parses_datasets_steps_and_output() {
        let def = parse_yaml_pipeline(TWO).unwrap();
        assert_eq!(def.batch_size, Some(1000));
        assert_eq!(def.datasets.len(), 2);
        assert_eq!(def.datasets[0].steps[0].op, Op::FixSequences);
        assert!(def.datasets[0].steps[1].optional);
        assert_eq!(def.datasets[1].agency, None);

        let out = def.output.as_ref().unwrap();
        assert_eq!(out.options().scope, ExportScope::agency("A"));
        assert_eq!(out.feed_info.publisher_name, "Transit Data");
        assert_eq!(out.feed_info.lang, FeedInfoConfig::default().lang);

        let cfg = def.engine_config(&EngineConfig::default());
        assert_eq!(cfg.batch_size, 1000);
    }

    #[test]
    fn explain_lists_every_step() {
        let def = parse_yaml_pipeline(TWO).unwrap();
        let lines = def.explain();
        assert_eq!(lines[0], "dataset 1 (agency A): feeds/a.zip");
        assert_eq!(lines[3], "  3. drop_unused_entities (optional)");
        assert!(lines.contains(&"merge 2 datasets".to_string()));
        assert_eq!(lines.last().unwrap(), "export_gtfs out/feed.zip (agency A)");
    }

    #[test]
    fn single_dataset_pipeline_ends_with_export() {
        let def = parse_yaml_pipeline(
            "datasets:\n  - input: a.zip\n    steps:\n      - op: merge_routes\noutput:\n  path: out.zip\n",
        )
        .unwrap();
        let pipelines = def.build(&EngineConfig::default()).unwrap();
        let ids: Vec<_> = pipelines[0].tasks().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["import_gtfs", "merge_routes", "export_gtfs"]);
    }

    #[test]
    fn invalid_definitions_are_rejected() {
        for (src, needle) in [
            ("datasets: []", "at least one dataset"),
            ("batch_size: 0\ndatasets:\n  - input: a.zip", "batch_size"),
            ("datasets:\n  - input: a.zip\n    steps:\n      - op: geocode", "unknown variant"),
            (
                "datasets:\n  - input: a.zip\n    agency: X\n  - input: b.zip\n    agency: X",
                "used by another dataset",
            ),
            ("datasets:\n  - input: a.zip\n    inptu: b.zip", "unknown field"),
        ] {
            let err = parse_yaml_pipeline(src).unwrap_err();
            assert!(matches!(err, ExecError::Dsl(_)), "{src}");
            assert!(err.to_string().contains(needle), "{src}: {err}");
        }
    }
}
