//! `SQLite`-backed feed store.
//!
//! One connection per store. All methods take `&self`; transactions are
//! opened with `unchecked_transaction` so that a guard or a running scan can
//! hold a shared borrow at the same time.

use std::path::Path;

use gtfsflow_core::config::StoreConfig;
use gtfsflow_core::row::Row;
use gtfsflow_core::schema::TableDef;
use gtfsflow_core::value::Value;
use rusqlite::{params_from_iter, Connection};

use crate::error::{Error, Result};
use crate::guard::IntegrityGuard;
use crate::schema::CREATE_TABLES;
use crate::value::{read_row, to_sql};

/// A `WHERE` clause plus its positional parameters (`?1`, `?2`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub clause: Option<String>,
    pub params: Vec<Value>,
}

impl Filter {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(clause: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            clause: Some(clause.into()),
            params,
        }
    }

    /// ` WHERE ...` or the empty string.
    pub fn sql(&self) -> String {
        self.clause
            .as_deref()
            .map(|c| format!(" WHERE {c}"))
            .unwrap_or_default()
    }

    /// Parameters converted for binding.
    pub fn bind(&self) -> Vec<rusqlite::types::Value> {
        self.params.iter().map(to_sql).collect()
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a file-backed store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory can't be created, or
    /// [`Error::Sqlite`] if the database can't be opened or initialized.
    pub fn open(path: &Path, cfg: &StoreConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?, cfg)
    }

    /// Create an in-memory store. This is what pipelines use by default.
    pub fn open_in_memory(cfg: &StoreConfig) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, cfg)
    }

    /// In-memory store with default settings.
    pub fn in_memory() -> Result<Self> {
        Self::open_in_memory(&StoreConfig::default())
    }

    fn init(conn: Connection, cfg: &StoreConfig) -> Result<Self> {
        // journal_mode and mmap_size report their new value as a row.
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", &cfg.journal_mode, |r| r.get(0))?;
        conn.pragma_update(None, "synchronous", &cfg.synchronous)?;
        conn.pragma_update(
            None,
            "temp_store",
            if cfg.temp_store_memory { "MEMORY" } else { "DEFAULT" },
        )?;
        let _mmap: Option<i64> =
            conn.pragma_update_and_check(None, "mmap_size", cfg.mmap_size, |r| r.get(0))
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
        conn.execute_batch(CREATE_TABLES)?;
        let store = Self { conn };
        store.set_foreign_keys(cfg.foreign_keys)?;
        tracing::debug!(journal_mode = %cfg.journal_mode, "store opened");
        Ok(store)
    }

    /// Raw connection for tasks that run their own SQL.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn foreign_keys_enabled(&self) -> Result<bool> {
        let on: i64 = self
            .conn
            .pragma_query_value(None, "foreign_keys", |r| r.get(0))?;
        Ok(on != 0)
    }

    /// Has no effect inside an open transaction (SQLite semantics).
    pub fn set_foreign_keys(&self, on: bool) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", on)?;
        Ok(())
    }

    /// Suspend foreign-key enforcement until the returned guard is restored
    /// or dropped.
    pub fn suspend_integrity(&self) -> Result<IntegrityGuard<'_>> {
        IntegrityGuard::new(self)
    }

    pub fn count(&self, table: &str) -> Result<u64> {
        self.count_where(table, &Filter::none())
    }

    pub fn count_where(&self, table: &str, filter: &Filter) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {table}{}", filter.sql());
        let n: i64 = self
            .conn
            .query_row(&sql, params_from_iter(filter.bind()), |r| r.get(0))?;
        Ok(u64::try_from(n).unwrap_or_default())
    }

    /// Stream every row of `def`'s table matching `filter` into `f`, in the
    /// order the store returns them. Returns the number of rows visited.
    pub fn scan<E, F>(&self, def: &TableDef, filter: &Filter, mut f: F) -> std::result::Result<u64, E>
    where
        E: From<Error>,
        F: FnMut(Row) -> std::result::Result<(), E>,
    {
        let sql = format!(
            "SELECT {} FROM {}{}",
            def.storage_columns().join(", "),
            def.table,
            filter.sql()
        );
        let mut stmt = self.conn.prepare(&sql).map_err(Error::from)?;
        let mut rows = stmt
            .query(params_from_iter(filter.bind()))
            .map_err(Error::from)?;
        let mut visited = 0u64;
        while let Some(sql_row) = rows.next().map_err(Error::from)? {
            let row = read_row(def, sql_row).map_err(Error::from)?;
            f(row)?;
            visited += 1;
        }
        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfsflow_core::feed;

    #[test]
    fn opens_with_schema_and_foreign_keys() {
        let store = Store::in_memory().unwrap();
        assert!(store.foreign_keys_enabled().unwrap());
        for def in feed::GTFS_TABLES {
            assert_eq!(store.count(def.table).unwrap(), 0, "{}", def.table);
        }
    }

    #[test]
    fn foreign_keys_follow_config() {
        let cfg = StoreConfig {
            foreign_keys: false,
            ..StoreConfig::default()
        };
        let store = Store::open_in_memory(&cfg).unwrap();
        assert!(!store.foreign_keys_enabled().unwrap());
    }

    #[test]
    fn file_backed_store_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("feed.db");
        let store = Store::open(&path, &StoreConfig::default()).unwrap();
        assert_eq!(store.count("agency").unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn scan_respects_filter_and_order() {
        let store = Store::in_memory().unwrap();
        store
            .conn()
            .execute_batch(
                "INSERT INTO calendar VALUES ('WK',1,1,1,1,1,0,0,'20240101','20241231');
                 INSERT INTO calendar VALUES ('SA',0,0,0,0,0,1,0,'20240101','20240630');",
            )
            .unwrap();
        let filter = Filter::new("saturday = ?1", vec![Value::Integer(1)]);
        assert_eq!(store.count_where("calendar", &filter).unwrap(), 1);

        let mut ids = Vec::new();
        let visited = store
            .scan::<Error, _>(&feed::CALENDAR, &Filter::none(), |row| {
                ids.push(row.values[0].clone());
                Ok(())
            })
            .unwrap();
        assert_eq!(visited, 2);
        assert_eq!(ids, vec![Value::from("WK"), Value::from("SA")]);
    }
}
