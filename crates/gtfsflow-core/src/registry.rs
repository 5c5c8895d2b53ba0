//! Table registry: archive entry name → table definition.
//!
//! Keeps registration order so exports and merges are deterministic.

use std::collections::HashMap;

use crate::feed::GTFS_TABLES;
use crate::schema::TableDef;

pub struct Registry {
    order: Vec<&'static TableDef>,
    by_file: HashMap<&'static str, &'static TableDef>,
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            order: Vec::new(),
            by_file: HashMap::new(),
        }
    }

    /// Registry over the full GTFS data dictionary.
    pub fn gtfs() -> Self {
        let mut r = Self::empty();
        for def in GTFS_TABLES {
            r.register(def);
        }
        r
    }

    /// Register a definition. Re-registering a file name replaces the
    /// previous binding in place.
    pub fn register(&mut self, def: &'static TableDef) {
        if self.by_file.insert(def.file_name, def).is_some() {
            self.order.retain(|d| d.file_name != def.file_name);
        }
        self.order.push(def);
    }

    pub fn by_file_name(&self, name: &str) -> Option<&'static TableDef> {
        self.by_file.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static TableDef> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::gtfs()
    }
}
