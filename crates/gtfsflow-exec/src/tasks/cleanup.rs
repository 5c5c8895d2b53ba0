//! Feed hygiene: unused entities and sequence numbering.

use serde_json::{json, Map};

use crate::error::TaskError;
use crate::task::{Task, TaskContext, TaskOutput};

/// Delete rows nothing refers to, children before parents so that each
/// pass sees the previous one's deletions. Stops survive when used by a
/// stop time directly or as an ancestor station of one that is.
#[derive(Debug, Clone, Default)]
pub struct DropUnusedEntities;

const DELETES: &[(&str, &str)] = &[
    (
        "trips",
        "DELETE FROM trips WHERE trip_id NOT IN (SELECT DISTINCT trip_id FROM stop_times)",
    ),
    (
        "routes",
        "DELETE FROM routes WHERE route_id NOT IN (SELECT DISTINCT route_id FROM trips)",
    ),
    (
        "agency",
        "DELETE FROM agency WHERE agency_id NOT IN (SELECT DISTINCT agency_id FROM routes)",
    ),
    (
        "calendar",
        "DELETE FROM calendar WHERE service_id NOT IN (SELECT DISTINCT service_id FROM trips)",
    ),
    (
        "calendar_dates",
        "DELETE FROM calendar_dates WHERE service_id NOT IN (SELECT DISTINCT service_id FROM trips)",
    ),
    (
        "shapes",
        "DELETE FROM shapes WHERE shape_id NOT IN
             (SELECT DISTINCT shape_id FROM trips WHERE shape_id IS NOT NULL)",
    ),
    (
        "stops",
        "WITH RECURSIVE used_stops(stop_id) AS (
             SELECT DISTINCT stop_id FROM stop_times
             UNION
             SELECT s.parent_station FROM stops s
                 JOIN used_stops u ON s.stop_id = u.stop_id
                 WHERE s.parent_station IS NOT NULL
         )
         DELETE FROM stops WHERE stop_id NOT IN used_stops",
    ),
];

impl Task for DropUnusedEntities {
    fn id(&self) -> &str {
        "drop_unused_entities"
    }

    fn execute(&mut self, ctx: &TaskContext<'_>) -> Result<Option<TaskOutput>, TaskError> {
        let tx = ctx.store.conn().unchecked_transaction()?;
        let mut deleted = Map::new();
        for (table, sql) in DELETES {
            let n = tx.execute(sql, [])?;
            deleted.insert((*table).to_string(), json!(n));
        }
        tx.commit()?;
        tracing::info!(deleted = %serde_json::Value::Object(deleted.clone()), "unused entities dropped");
        Ok(Some(TaskOutput::Json(json!({ "deleted": deleted }))))
    }
}

/// Renumber `stop_sequence` per trip and `shape_pt_sequence` per shape to
/// `0..n`, keeping their order. Values pass through negatives first so the
/// `(trip_id, stop_sequence)` and `(shape_id, shape_pt_sequence)` unique
/// indexes never see a transient duplicate.
#[derive(Debug, Clone, Default)]
pub struct FixSequences;

fn renumber_sql(table: &str, group: &str, seq: &str) -> [String; 2] {
    [
        format!(
            "WITH numbered AS MATERIALIZED (
                 SELECT {group}, {seq},
                        ROW_NUMBER() OVER (PARTITION BY {group} ORDER BY {seq} ASC) - 1 AS new_seq
                 FROM {table}
             )
             UPDATE {table} SET {seq} = -1 * (
                 SELECT new_seq FROM numbered
                 WHERE numbered.{group} = {table}.{group} AND numbered.{seq} = {table}.{seq}
             ) - 1"
        ),
        format!("UPDATE {table} SET {seq} = ({seq} * -1) - 1"),
    ]
}

impl Task for FixSequences {
    fn id(&self) -> &str {
        "fix_sequences"
    }

    fn execute(&mut self, ctx: &TaskContext<'_>) -> Result<Option<TaskOutput>, TaskError> {
        let tx = ctx.store.conn().unchecked_transaction()?;
        for (table, group, seq) in [
            ("stop_times", "trip_id", "stop_sequence"),
            ("shapes", "shape_id", "shape_pt_sequence"),
        ] {
            for sql in renumber_sql(table, group, seq) {
                tx.execute(&sql, [])?;
            }
        }
        tx.commit()?;
        Ok(None)
    }
}
