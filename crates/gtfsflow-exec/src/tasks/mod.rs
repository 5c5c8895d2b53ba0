//! Built-in tasks and the `op` names the pipeline DSL knows them by.

pub mod archive;
pub mod cleanup;
pub mod routes;
pub mod services;
pub mod trips;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use archive::{ExportGtfs, ImportGtfs, ImportSource};
pub use cleanup::{DropUnusedEntities, FixSequences};
pub use routes::{GenerateRouteLongNames, MergeRoutes};
pub use services::ActiveServicesTask;
pub use trips::GenerateStableTripIds;

use crate::task::Task;

/// A configurable built-in step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    DropUnusedEntities,
    FixSequences,
    MergeRoutes,
    GenerateRouteLongNames,
    GenerateStableTripIds,
    ActiveServices {
        #[serde(default = "default_backward_days")]
        backward_days: u32,
        #[serde(default = "default_forward_days")]
        forward_days: u32,
        #[serde(default)]
        today: Option<NaiveDate>,
    },
}

fn default_backward_days() -> u32 {
    1
}

fn default_forward_days() -> u32 {
    7
}

impl Op {
    /// Task id the op runs under.
    pub fn id(&self) -> &'static str {
        match self {
            Op::DropUnusedEntities => "drop_unused_entities",
            Op::FixSequences => "fix_sequences",
            Op::MergeRoutes => "merge_routes",
            Op::GenerateRouteLongNames => "generate_route_long_names",
            Op::GenerateStableTripIds => "generate_stable_trip_ids",
            Op::ActiveServices { .. } => "active_services",
        }
    }

    pub fn into_task(self) -> Box<dyn Task> {
        match self {
            Op::DropUnusedEntities => Box::new(DropUnusedEntities),
            Op::FixSequences => Box::new(FixSequences),
            Op::MergeRoutes => Box::new(MergeRoutes),
            Op::GenerateRouteLongNames => Box::new(GenerateRouteLongNames),
            Op::GenerateStableTripIds => Box::new(GenerateStableTripIds),
            Op::ActiveServices {
                backward_days,
                forward_days,
                today,
            } => Box::new(ActiveServicesTask {
                backward_days,
                forward_days,
                today,
            }),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_parse_from_tagged_yaml() {
        let op: Op = serde_yaml::from_str("op: fix_sequences").unwrap();
        assert_eq!(op, Op::FixSequences);

        let op: Op = serde_yaml::from_str("op: generate_stable_trip_ids").unwrap();
        assert_eq!(op.into_task().id(), "generate_stable_trip_ids");

        let op: Op = serde_yaml::from_str("op: active_services\nforward_days: 3").unwrap();
        assert_eq!(
            op,
            Op::ActiveServices {
                backward_days: 1,
                forward_days: 3,
                today: None
            }
        );
        assert_eq!(op.id(), "active_services");
        assert_eq!(op.into_task().id(), "active_services");
    }

    #[test]
    fn unknown_op_is_rejected() {
        let err = serde_yaml::from_str::<Op>("op: geocode_stops").unwrap_err();
        assert!(err.to_string().contains("unknown variant"), "{err}");
    }
}
