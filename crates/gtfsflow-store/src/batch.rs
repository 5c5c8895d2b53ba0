//! Batch transaction helper.
//!
//! One parameterized `INSERT OR IGNORE` per table, applied to every row of a
//! batch inside a single transaction. A failure anywhere in the batch drops
//! the transaction, which rolls it back: a batch is committed whole or not
//! at all. Rows whose key already exists are skipped, never replaced.

use gtfsflow_core::row::Row;
use gtfsflow_core::schema::TableDef;
use rusqlite::params_from_iter;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::value::row_params;

/// `INSERT OR IGNORE INTO t (c1, ..) VALUES (?1, ..)` over the storage columns.
pub fn insert_sql(def: &TableDef) -> String {
    let cols = def.storage_columns();
    let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
        def.table,
        cols.join(", "),
        placeholders.join(", ")
    )
}

/// Commits batches into one table and keeps running totals.
pub struct BatchInserter<'a> {
    store: &'a Store,
    def: &'a TableDef,
    sql: String,
    batch_sizes: Vec<usize>,
    rows_written: u64,
}

impl<'a> BatchInserter<'a> {
    pub fn new(store: &'a Store, def: &'a TableDef) -> Self {
        Self {
            store,
            def,
            sql: insert_sql(def),
            batch_sizes: Vec::new(),
            rows_written: 0,
        }
    }

    /// Apply `rows` in one transaction. Returns how many rows were actually
    /// inserted (duplicates excluded). An empty slice is a no-op and does
    /// not count as a batch.
    pub fn commit(&mut self, rows: &[Row]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let table = self.def.table;
        let batch_no = self.batch_sizes.len() + 1;
        let ctx = |e: Error| e.with_context(format!("{table}: batch {batch_no}"));

        let tx = self
            .store
            .conn()
            .unchecked_transaction()
            .map_err(|e| ctx(e.into()))?;
        let mut written = 0u64;
        {
            let mut stmt = tx.prepare_cached(&self.sql).map_err(|e| ctx(e.into()))?;
            for row in rows {
                let n = stmt
                    .execute(params_from_iter(row_params(self.def, row)))
                    .map_err(|e| ctx(Error::from_write(table, e)))?;
                written += n as u64;
            }
        }
        tx.commit().map_err(|e| ctx(Error::from_write(table, e)))?;

        self.batch_sizes.push(rows.len());
        self.rows_written += written;
        tracing::debug!(table, batch = batch_no, rows = rows.len(), written, "batch committed");
        Ok(written)
    }

    pub fn batches(&self) -> usize {
        self.batch_sizes.len()
    }

    /// Row count of every committed batch, in commit order.
    pub fn batch_sizes(&self) -> &[usize] {
        &self.batch_sizes
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}
