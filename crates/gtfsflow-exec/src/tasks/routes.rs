//! Route-level rewrites.

use serde_json::json;

use crate::error::TaskError;
use crate::task::{Task, TaskContext, TaskOutput};

/// Collapse routes sharing `(route_short_name, route_type, agency_id)` onto
/// the smallest `route_id` of the group and repoint their trips.
#[derive(Debug, Clone, Default)]
pub struct MergeRoutes;

impl Task for MergeRoutes {
    fn id(&self) -> &str {
        "merge_routes"
    }

    fn execute(&mut self, ctx: &TaskContext<'_>) -> Result<Option<TaskOutput>, TaskError> {
        let guard = ctx.store.suspend_integrity()?;
        let tx = ctx.store.conn().unchecked_transaction()?;
        tx.execute_batch(
            "CREATE TEMP TABLE route_merge (remove_id TEXT PRIMARY KEY, keep_id TEXT NOT NULL);
             INSERT INTO route_merge (remove_id, keep_id)
             SELECT r.route_id, grp.keep_id FROM routes r
             JOIN (
                 SELECT route_short_name, route_type, agency_id, MIN(route_id) AS keep_id
                 FROM routes
                 GROUP BY route_short_name, route_type, agency_id
                 HAVING COUNT(*) > 1
             ) grp ON r.route_short_name = grp.route_short_name
                  AND r.route_type = grp.route_type
                  AND r.agency_id = grp.agency_id
             WHERE r.route_id != grp.keep_id;
             UPDATE trips
             SET route_id = (SELECT keep_id FROM route_merge WHERE remove_id = trips.route_id)
             WHERE route_id IN (SELECT remove_id FROM route_merge);",
        )?;
        let merged = tx.execute(
            "DELETE FROM routes WHERE route_id IN (SELECT remove_id FROM route_merge)",
            [],
        )?;
        tx.execute_batch("DROP TABLE route_merge;")?;
        tx.commit()?;
        guard.restore()?;
        Ok(Some(TaskOutput::Json(json!({ "merged": merged }))))
    }
}

/// Name each route after the first and last stop of its most frequent
/// trip pattern: `"<first stop> – <last stop>"`.
#[derive(Debug, Clone, Default)]
pub struct GenerateRouteLongNames;

impl Task for GenerateRouteLongNames {
    fn id(&self) -> &str {
        "generate_route_long_names"
    }

    fn execute(&mut self, ctx: &TaskContext<'_>) -> Result<Option<TaskOutput>, TaskError> {
        let tx = ctx.store.conn().unchecked_transaction()?;
        tx.execute_batch(
            "CREATE TEMP TABLE trip_bounds AS
             SELECT DISTINCT
                 t.trip_id,
                 t.route_id,
                 FIRST_VALUE(st.stop_id) OVER w AS first_stop,
                 LAST_VALUE(st.stop_id) OVER w AS last_stop
             FROM stop_times st
             JOIN trips t ON st.trip_id = t.trip_id
             WINDOW w AS (PARTITION BY st.trip_id ORDER BY st.stop_sequence
                          ROWS BETWEEN UNBOUNDED PRECEDING AND UNBOUNDED FOLLOWING);

             CREATE TEMP TABLE best_pattern AS
             SELECT route_id, first_stop, last_stop FROM (
                 SELECT route_id, first_stop, last_stop,
                        ROW_NUMBER() OVER (PARTITION BY route_id ORDER BY COUNT(*) DESC, first_stop, last_stop) AS rn
                 FROM trip_bounds
                 GROUP BY route_id, first_stop, last_stop
             ) WHERE rn = 1;",
        )?;
        let updated = tx.execute(
            "UPDATE routes
             SET route_long_name = (
                 SELECT s1.stop_name || ' – ' || s2.stop_name
                 FROM best_pattern bp
                 JOIN stops s1 ON s1.stop_id = bp.first_stop
                 JOIN stops s2 ON s2.stop_id = bp.last_stop
                 WHERE bp.route_id = routes.route_id
             )
             WHERE route_id IN (
                 SELECT bp.route_id FROM best_pattern bp
                 JOIN stops s1 ON s1.stop_id = bp.first_stop
                 JOIN stops s2 ON s2.stop_id = bp.last_stop
             )",
            [],
        )?;
        tx.execute_batch("DROP TABLE trip_bounds; DROP TABLE best_pattern;")?;
        tx.commit()?;
        Ok(Some(TaskOutput::Json(json!({ "updated": updated }))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::testing::{column, run, store};

    const FEED: &str = "
        INSERT INTO agency (agency_id, agency_name, agency_url, agency_timezone) VALUES
            ('A', 'Agency', 'https://a.example', 'UTC');
        INSERT INTO stops (stop_id, stop_name, stop_lat, stop_lon) VALUES
            ('S1', 'Depot', 52, 21), ('S2', 'Market', 52, 21), ('S3', 'Harbour', 52, 21);
        INSERT INTO routes (route_id, agency_id, route_short_name, route_long_name, route_type) VALUES
            ('R1', 'A', '7', '', 3),
            ('R3', 'A', '7', '', 3),
            ('R9', 'A', '7', '', 0);
        INSERT INTO calendar VALUES ('WK',1,1,1,1,1,0,0,'20240101','20241231');
        INSERT INTO trips (route_id, service_id, trip_id) VALUES
            ('R1', 'WK', 'T1'), ('R3', 'WK', 'T2'), ('R3', 'WK', 'T3'), ('R9', 'WK', 'T4');
        INSERT INTO stop_times (trip_id, arrival_time, departure_time, stop_id, stop_sequence) VALUES
            ('T1', 1, 1, 'S1', 0), ('T1', 2, 2, 'S2', 1),
            ('T2', 1, 1, 'S1', 0), ('T2', 2, 2, 'S3', 1),
            ('T3', 1, 1, 'S1', 0), ('T3', 2, 2, 'S3', 1),
            ('T4', 1, 1, 'S2', 0), ('T4', 2, 2, 'S3', 1);
    ";

    #[test]
    fn duplicate_routes_collapse_onto_smallest_id() {
        let store = store(FEED);
        run(&mut MergeRoutes, &store).unwrap();
        assert_eq!(
            column(&store, "SELECT route_id FROM routes ORDER BY route_id"),
            vec!["R1", "R9"]
        );
        assert_eq!(
            column(&store, "SELECT route_id FROM trips ORDER BY trip_id"),
            vec!["R1", "R1", "R1", "R9"]
        );
        assert!(store.foreign_keys_enabled().unwrap());
        // Temp table is gone, so the task can run again.
        run(&mut MergeRoutes, &store).unwrap();
    }

    #[test]
    fn long_names_follow_most_frequent_pattern() {
        let store = store(FEED);
        run(&mut MergeRoutes, &store).unwrap();
        run(&mut GenerateRouteLongNames, &store).unwrap();
        assert_eq!(
            column(&store, "SELECT route_long_name FROM routes ORDER BY route_id"),
            vec!["Depot – Harbour", "Market – Harbour"]
        );
    }
}
