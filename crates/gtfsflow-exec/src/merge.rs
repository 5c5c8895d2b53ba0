//! Dataset Merger.
//!
//! Folds several single-agency source stores into one target store. Each
//! source is namespaced in place (its agency collapsed onto the prefix, every
//! key column prefixed) and then copied table by table through the
//! conflict-ignoring batch helper. Foreign keys are off on the target for
//! the whole merge and on each source while it is rewritten and copied.
//!
//! Sources are merged one after another and there is no rollback across
//! them: when source `n` fails, sources `0..n` stay in the target.

use gtfsflow_core::batch::Batch;
use gtfsflow_core::config::EngineConfig;
use gtfsflow_core::namespace::{default_prefix, AGENCY_REFERENCES, PREFIXED_COLUMNS};
use gtfsflow_core::registry::Registry;
use gtfsflow_store::{BatchInserter, Filter, Store};
use rusqlite::params;
use serde::Serialize;
use tracing::info;

use crate::error::{ExecError, TaskError};
use crate::pipeline::{Pipeline, RunReport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMerge {
    pub table: String,
    pub rows_read: u64,
    pub rows_inserted: u64,
    pub batches: usize,
    pub batch_sizes: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetMerge {
    pub prefix: String,
    pub tables: Vec<TableMerge>,
    /// Report of the source pipeline, when the merger ran it.
    pub run: Option<RunReport>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub datasets: Vec<DatasetMerge>,
}

pub struct Merger {
    target: Store,
    config: EngineConfig,
    registry: Registry,
}

impl Merger {
    /// Merger over a fresh in-memory target.
    pub fn new(config: EngineConfig) -> Result<Self, ExecError> {
        config.validate()?;
        let target = Store::open_in_memory(&config.store)?;
        Ok(Self::with_target(target, config))
    }

    pub fn with_target(target: Store, config: EngineConfig) -> Self {
        Self {
            target,
            config,
            registry: Registry::gtfs(),
        }
    }

    pub fn target(&self) -> &Store {
        &self.target
    }

    pub fn into_target(self) -> Store {
        self.target
    }

    /// Run each pipeline, then merge its store. A pipeline without an
    /// agency gets `DATASET_{i}` as its prefix.
    pub fn merge_pipelines(&mut self, pipelines: Vec<Pipeline>) -> Result<MergeReport, ExecError> {
        let guard = self.target.suspend_integrity()?;
        let mut report = MergeReport::default();
        let total = pipelines.len();

        for (i, mut pipeline) in pipelines.into_iter().enumerate() {
            let prefix = pipeline
                .agency()
                .map_or_else(|| default_prefix(i), str::to_string);
            info!(dataset = i + 1, of = total, %prefix, "running dataset pipeline");
            let run = pipeline.run()?;
            let source = pipeline.into_store();
            let mut merged = self.merge_one(&source, &prefix)?;
            merged.run = Some(run);
            report.datasets.push(merged);
        }

        guard.restore()?;
        info!(datasets = report.datasets.len(), "all datasets merged");
        Ok(report)
    }

    /// Merge already-built stores. `None` prefixes fall back to
    /// `DATASET_{i}`.
    pub fn merge_stores(
        &mut self,
        sources: Vec<(Option<String>, Store)>,
    ) -> Result<MergeReport, ExecError> {
        let guard = self.target.suspend_integrity()?;
        let mut report = MergeReport::default();

        for (i, (prefix, source)) in sources.into_iter().enumerate() {
            let prefix = prefix.unwrap_or_else(|| default_prefix(i));
            report.datasets.push(self.merge_one(&source, &prefix)?);
        }

        guard.restore()?;
        info!(datasets = report.datasets.len(), "all datasets merged");
        Ok(report)
    }

    fn merge_one(&self, source: &Store, prefix: &str) -> Result<DatasetMerge, ExecError> {
        let wrap = |source: TaskError| ExecError::Merge {
            prefix: prefix.to_string(),
            source,
        };
        let guard = source.suspend_integrity().map_err(|e| wrap(e.into()))?;
        namespace(source, prefix).map_err(|e| wrap(e.into()))?;

        let mut tables = Vec::new();
        for def in self.registry.iter() {
            let mut inserter = BatchInserter::new(&self.target, def);
            let mut batch = Batch::with_capacity(self.config.batch_size);
            let rows_read = source
                .scan(def, &Filter::none(), |row| {
                    if batch.push(row) {
                        inserter.commit(batch.rows())?;
                        batch.clear();
                    }
                    Ok::<_, gtfsflow_store::Error>(())
                })
                .and_then(|n| {
                    if !batch.is_empty() {
                        inserter.commit(batch.rows())?;
                    }
                    Ok(n)
                })
                .map_err(|e| wrap(e.with_context(def.table).into()))?;
            tables.push(TableMerge {
                table: def.table.to_string(),
                rows_read,
                rows_inserted: inserter.rows_written(),
                batches: inserter.batches(),
                batch_sizes: inserter.batch_sizes().to_vec(),
            });
        }

        guard.restore().map_err(|e| wrap(e.into()))?;
        let inserted: u64 = tables.iter().map(|t| t.rows_inserted).sum();
        info!(%prefix, rows = inserted, "dataset merged");
        Ok(DatasetMerge {
            prefix: prefix.to_string(),
            tables,
            run: None,
        })
    }
}

/// Rewrite `store` so its identifiers cannot collide with another
/// dataset's: keep one agency and give it the prefix as id, prefix every
/// key column, leave empty optional references alone. One transaction.
///
/// Foreign keys must be suspended by the caller. Each column is rewritten
/// longest values first, so a source id that already reads `<prefix>_<id>`
/// is moved out of the way before `<id>` is prefixed onto it.
pub fn namespace(store: &Store, prefix: &str) -> Result<(), gtfsflow_store::Error> {
    let tx = store.conn().unchecked_transaction()?;
    tx.execute(
        "DELETE FROM agency WHERE rowid NOT IN (SELECT rowid FROM agency LIMIT 1)",
        [],
    )?;
    for (table, column) in AGENCY_REFERENCES {
        tx.execute(&format!("UPDATE {table} SET {column} = ?1"), [prefix])?;
    }
    for col in PREFIXED_COLUMNS {
        let (table, column) = (col.table, col.column);
        let only_set = if col.optional {
            format!(" AND {column} != ''")
        } else {
            String::new()
        };
        let lengths: Vec<i64> = {
            let mut stmt = tx.prepare(&format!(
                "SELECT DISTINCT length({column}) FROM {table}
                 WHERE {column} IS NOT NULL{only_set} ORDER BY 1 DESC"
            ))?;
            let rows = stmt.query_map([], |r| r.get(0))?;
            rows.collect::<Result<_, _>>()?
        };
        for len in lengths {
            tx.execute(
                &format!(
                    "UPDATE {table} SET {column} = ?1 || '_' || {column}
                     WHERE length({column}) = ?2{only_set}"
                ),
                params![prefix, len],
            )?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(stop_name: &str) -> Store {
        let store = Store::in_memory().unwrap();
        store
            .conn()
            .execute_batch(&format!(
                "INSERT INTO agency (agency_id, agency_name, agency_url, agency_timezone)
                     VALUES ('1', 'Operator', 'https://op.example', 'UTC'),
                            ('2', 'Second', 'https://two.example', 'UTC');
                 INSERT INTO stops (stop_id, stop_name, stop_lat, stop_lon, parent_station, zone_id)
                     VALUES ('S1', '{stop_name}', 52.0, 21.0, NULL, ''),
                            ('S2', 'Platform', 52.0, 21.0, 'S1', 'Z1');
                 INSERT INTO routes (route_id, agency_id, route_short_name, route_long_name, route_type)
                     VALUES ('R1', '1', '10', 'Ten', 3);
                 INSERT INTO calendar VALUES ('WK',1,1,1,1,1,0,0,'20240101','20241231');
                 INSERT INTO trips (route_id, service_id, trip_id, block_id)
                     VALUES ('R1', 'WK', 'T1', '');
                 INSERT INTO stop_times (trip_id, arrival_time, departure_time, stop_id, stop_sequence)
                     VALUES ('T1', 29100, 29100, 'S2', 0);"
            ))
            .unwrap();
        store
    }

    fn ids(store: &Store, sql: &str) -> Vec<Option<String>> {
        let mut stmt = store.conn().prepare(sql).unwrap();
        let rows = stmt.query_map([], |r| r.get(0)).unwrap();
        rows.map(Result::unwrap).collect()
    }

    #[test]
    fn namespace_prefixes_keys_and_skips_empty_references() {
        let store = dataset("Central");
        let guard = store.suspend_integrity().unwrap();
        namespace(&store, "A").unwrap();
        guard.restore().unwrap();
        assert_eq!(ids(&store, "SELECT agency_id FROM agency"), vec![Some("A".into())]);
        assert_eq!(
            ids(&store, "SELECT parent_station FROM stops ORDER BY stop_id"),
            vec![None, Some("A_S1".into())]
        );
        assert_eq!(
            ids(&store, "SELECT zone_id FROM stops ORDER BY stop_id"),
            vec![Some(String::new()), Some("A_Z1".into())]
        );
        assert_eq!(ids(&store, "SELECT block_id FROM trips"), vec![Some(String::new())]);
        assert_eq!(ids(&store, "SELECT route_id FROM trips"), vec![Some("A_R1".into())]);
    }

    #[test]
    fn ids_already_carrying_the_prefix_do_not_clash() {
        let store = dataset("Central");
        store
            .conn()
            .execute_batch(
                "INSERT INTO stops (stop_id, stop_name, stop_lat, stop_lon)
                     VALUES ('A_S1', 'Lookalike', 52.0, 21.0), ('A_A_S1', 'Deeper', 52.0, 21.0);
                 INSERT INTO stop_times (trip_id, arrival_time, departure_time, stop_id, stop_sequence)
                     VALUES ('T1', 29400, 29400, 'A_S1', 1);",
            )
            .unwrap();
        let guard = store.suspend_integrity().unwrap();
        namespace(&store, "A").unwrap();
        guard.restore().unwrap();

        assert_eq!(
            ids(&store, "SELECT stop_id FROM stops ORDER BY stop_id"),
            vec![
                Some("A_A_A_S1".into()),
                Some("A_A_S1".into()),
                Some("A_S1".into()),
                Some("A_S2".into()),
            ]
        );
        assert_eq!(
            ids(&store, "SELECT stop_id FROM stop_times ORDER BY stop_sequence"),
            vec![Some("A_S2".into()), Some("A_A_S1".into())]
        );
    }

    #[test]
    fn same_ids_from_two_datasets_stay_distinct() {
        let mut merger = Merger::new(EngineConfig::default()).unwrap();
        let report = merger
            .merge_stores(vec![
                (Some("A".into()), dataset("Alpha")),
                (Some("B".into()), dataset("Beta")),
            ])
            .unwrap();
        assert_eq!(report.datasets.len(), 2);

        let target = merger.target();
        assert_eq!(
            ids(target, "SELECT stop_id FROM stops WHERE stop_id LIKE '%S1' ORDER BY stop_id"),
            vec![Some("A_S1".into()), Some("B_S1".into())]
        );
        assert_eq!(target.count("agency").unwrap(), 2);
        assert_eq!(target.count("stop_times").unwrap(), 2);
        assert!(target.foreign_keys_enabled().unwrap());
    }

    #[test]
    fn rerunning_a_merge_inserts_nothing_new() {
        let mut merger = Merger::new(EngineConfig::default()).unwrap();
        merger
            .merge_stores(vec![(Some("A".into()), dataset("Alpha"))])
            .unwrap();
        let again = merger
            .merge_stores(vec![(Some("A".into()), dataset("Alpha"))])
            .unwrap();
        let inserted: u64 = again.datasets[0].tables.iter().map(|t| t.rows_inserted).sum();
        assert_eq!(inserted, 0);
        assert_eq!(merger.target().count("stops").unwrap(), 2);
    }

    #[test]
    fn missing_prefix_falls_back_to_position() {
        let mut merger = Merger::new(EngineConfig::default()).unwrap();
        let report = merger
            .merge_stores(vec![(None, dataset("Alpha"))])
            .unwrap();
        assert_eq!(report.datasets[0].prefix, "DATASET_0");
        assert_eq!(
            ids(merger.target(), "SELECT agency_id FROM agency"),
            vec![Some("DATASET_0".into())]
        );
    }
}
