//! Engine and store configuration.
//!
//! Defaults match what the engine expects for bulk loads: WAL journaling,
//! relaxed synchronous commits, in-memory temp storage and a large mmap
//! ceiling. Foreign keys are enforced between pipeline steps.

use serde::{Deserialize, Serialize};

use crate::batch::DEFAULT_BATCH_SIZE;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub journal_mode: String,
    pub synchronous: String,
    pub temp_store_memory: bool,
    pub mmap_size: i64,
    pub foreign_keys: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            journal_mode: "WAL".into(),
            synchronous: "NORMAL".into(),
            temp_store_memory: true,
            mmap_size: 600_000_000,
            foreign_keys: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows per committed transaction on import and merge.
    pub batch_size: usize,
    pub store: StoreConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            store: StoreConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `GTFSFLOW_BATCH_SIZE` and `GTFSFLOW_MMAP_SIZE`.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(n) = env_parse::<usize>("GTFSFLOW_BATCH_SIZE") {
            cfg.batch_size = n;
        }
        if let Some(n) = env_parse::<i64>("GTFSFLOW_MMAP_SIZE") {
            cfg.store.mmap_size = n;
        }
        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be greater than zero".into()));
        }
        if self.store.mmap_size < 0 {
            return Err(Error::Config("mmap_size must not be negative".into()));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
