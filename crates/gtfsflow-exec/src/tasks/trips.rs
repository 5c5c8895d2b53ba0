//! Trip identity.

use std::collections::HashMap;

use rusqlite::params;
use serde_json::json;

use crate::error::TaskError;
use crate::task::{Task, TaskContext, TaskOutput};

/// Replace every scheduled trip's id with one derived from what the trip
/// is: its route, service, first and last stop, first departure and last
/// arrival. Re-importing the same schedule yields the same ids, whatever
/// the producer called the trips. Stop times and frequencies follow.
///
/// Trips with identical keys are told apart by a `_2`, `_3`, ... suffix in
/// old id order. Trips without stop times keep their id.
#[derive(Debug, Clone, Default)]
pub struct GenerateStableTripIds;

struct TripKey {
    trip_id: String,
    route_id: String,
    service_id: String,
    first_stop: String,
    last_stop: String,
    first_departure: Option<i64>,
    last_arrival: Option<i64>,
}

impl TripKey {
    fn stable_id(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        let first = self.first_departure.map(|s| s.to_string()).unwrap_or_default();
        let last = self.last_arrival.map(|s| s.to_string()).unwrap_or_default();
        for part in [
            self.route_id.as_str(),
            &self.service_id,
            &self.first_stop,
            &self.last_stop,
            &first,
            &last,
        ] {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        let hex = hasher.finalize().to_hex();
        format!("{}_{}", self.route_id, &hex[..16])
    }
}

const TRIP_KEYS: &str = "
    SELECT DISTINCT
        t.trip_id,
        t.route_id,
        t.service_id,
        FIRST_VALUE(st.stop_id) OVER w,
        LAST_VALUE(st.stop_id) OVER w,
        FIRST_VALUE(st.departure_time) OVER w,
        LAST_VALUE(st.arrival_time) OVER w
    FROM stop_times st
    JOIN trips t ON st.trip_id = t.trip_id
    WINDOW w AS (PARTITION BY st.trip_id ORDER BY st.stop_sequence
                 ROWS BETWEEN UNBOUNDED PRECEDING AND UNBOUNDED FOLLOWING)
    ORDER BY t.trip_id";

impl Task for GenerateStableTripIds {
    fn id(&self) -> &str {
        "generate_stable_trip_ids"
    }

    fn execute(&mut self, ctx: &TaskContext<'_>) -> Result<Option<TaskOutput>, TaskError> {
        let guard = ctx.store.suspend_integrity()?;
        let tx = ctx.store.conn().unchecked_transaction()?;

        let keys: Vec<TripKey> = {
            let mut stmt = tx.prepare(TRIP_KEYS)?;
            let rows = stmt.query_map([], |r| {
                Ok(TripKey {
                    trip_id: r.get(0)?,
                    route_id: r.get(1)?,
                    service_id: r.get(2)?,
                    first_stop: r.get(3)?,
                    last_stop: r.get(4)?,
                    first_departure: r.get(5)?,
                    last_arrival: r.get(6)?,
                })
            })?;
            rows.collect::<Result<_, _>>()?
        };

        tx.execute_batch(
            "CREATE TEMP TABLE trip_id_mapping (old_id TEXT PRIMARY KEY, new_id TEXT NOT NULL UNIQUE);",
        )?;
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut renamed = 0usize;
        {
            let mut insert =
                tx.prepare("INSERT INTO trip_id_mapping (old_id, new_id) VALUES (?1, ?2)")?;
            for key in &keys {
                let base = key.stable_id();
                let n = seen.entry(base.clone()).or_insert(0);
                *n += 1;
                let new_id = if *n == 1 { base } else { format!("{base}_{n}") };
                if new_id != key.trip_id {
                    insert.execute(params![key.trip_id, new_id])?;
                    renamed += 1;
                }
            }
        }
        for table in ["stop_times", "frequencies", "trips"] {
            tx.execute(
                &format!(
                    "UPDATE {table}
                     SET trip_id = (SELECT new_id FROM trip_id_mapping WHERE old_id = {table}.trip_id)
                     WHERE trip_id IN (SELECT old_id FROM trip_id_mapping)"
                ),
                [],
            )?;
        }
        tx.execute_batch("DROP TABLE trip_id_mapping;")?;
        tx.commit()?;
        guard.restore()?;
        tracing::info!(renamed, trips = keys.len(), "stable trip ids generated");
        Ok(Some(TaskOutput::Json(json!({ "renamed": renamed }))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::testing::{column, run, store};

    fn feed(t1: &str, t2: &str, t3: &str) -> String {
        format!(
            "INSERT INTO agency (agency_id, agency_name, agency_url, agency_timezone) VALUES
                 ('A', 'Agency', 'https://a.example', 'UTC');
             INSERT INTO stops (stop_id, stop_name, stop_lat, stop_lon) VALUES
                 ('S1', 'Depot', 52, 21), ('S2', 'Market', 52, 21);
             INSERT INTO routes (route_id, agency_id, route_short_name, route_long_name, route_type) VALUES
                 ('R1', 'A', '7', '', 3);
             INSERT INTO calendar VALUES ('WK',1,1,1,1,1,0,0,'20240101','20241231');
             INSERT INTO trips (route_id, service_id, trip_id) VALUES
                 ('R1', 'WK', '{t1}'), ('R1', 'WK', '{t2}'), ('R1', 'WK', '{t3}'), ('R1', 'WK', 'EMPTY');
             INSERT INTO stop_times (trip_id, arrival_time, departure_time, stop_id, stop_sequence) VALUES
                 ('{t1}', 28800, 28800, 'S1', 0), ('{t1}', 29400, 29400, 'S2', 1),
                 ('{t2}', 32400, 32400, 'S1', 0), ('{t2}', 33000, 33000, 'S2', 1),
                 ('{t3}', 32400, 32400, 'S1', 0), ('{t3}', 33000, 33000, 'S2', 1);
             INSERT INTO frequencies (trip_id, start_time, end_time, headway_secs) VALUES
                 ('{t1}', '08:00:00', '09:00:00', 600);"
        )
    }

    #[test]
    fn new_ids_cascade_to_stop_times_and_frequencies() {
        let store = store(&feed("T1", "T2", "T3"));
        let out = run(&mut GenerateStableTripIds, &store).unwrap();
        assert_eq!(out, Some(TaskOutput::Json(json!({ "renamed": 3 }))));

        let trips = column(&store, "SELECT trip_id FROM trips ORDER BY trip_id");
        assert_eq!(trips.len(), 4);
        assert!(trips.contains(&"EMPTY".to_string()));
        assert!(!trips.iter().any(|t| t == "T1" || t == "T2" || t == "T3"));
        assert!(trips.iter().filter(|t| t.starts_with("R1_")).count() == 3);

        let twins: Vec<_> = trips.iter().filter(|t| t.ends_with("_2")).collect();
        assert_eq!(twins.len(), 1);

        let in_stop_times = column(&store, "SELECT DISTINCT trip_id FROM stop_times ORDER BY trip_id");
        let mut renamed: Vec<String> = trips.iter().filter(|t| *t != "EMPTY").cloned().collect();
        renamed.sort();
        assert_eq!(in_stop_times, renamed);

        let freq = column(&store, "SELECT trip_id FROM frequencies");
        let first = column(
            &store,
            "SELECT trip_id FROM stop_times WHERE arrival_time = 28800",
        );
        assert_eq!(freq, first);
        assert!(store.foreign_keys_enabled().unwrap());
    }

    #[test]
    fn ids_do_not_depend_on_producer_names() {
        let a = store(&feed("T1", "T2", "T3"));
        let b = store(&feed("morning", "noon-a", "noon-b"));
        run(&mut GenerateStableTripIds, &a).unwrap();
        run(&mut GenerateStableTripIds, &b).unwrap();

        let sql = "SELECT trip_id FROM stop_times WHERE stop_sequence = 0 ORDER BY arrival_time, trip_id";
        assert_eq!(column(&a, sql), column(&b, sql));
    }

    #[test]
    fn second_run_renames_nothing() {
        let store = store(&feed("T1", "T2", "T3"));
        run(&mut GenerateStableTripIds, &store).unwrap();
        let before = column(&store, "SELECT trip_id FROM trips ORDER BY trip_id");
        let out = run(&mut GenerateStableTripIds, &store).unwrap();
        assert_eq!(out, Some(TaskOutput::Json(json!({ "renamed": 0 }))));
        assert_eq!(column(&store, "SELECT trip_id FROM trips ORDER BY trip_id"), before);
    }
}
