#![forbid(unsafe_code)]
//! gtfsflow-core: shared kernel for the gtfsflow engine.
//!
//! This crate contains only *pure* types and small helpers that the other
//! crates build on. There is **no database access** and **no archive I/O**
//! here.
//!
//! Crates that use this:
//! - gtfsflow-store: binds `Row`s into SQLite statements, reads them back.
//! - gtfsflow-io: drives `TableDef` converters while streaming zip archives.
//! - gtfsflow-exec: orchestrates tasks, merges datasets using `namespace`.

pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod feed;
pub mod namespace;
pub mod registry;
pub mod row;
pub mod schema;
pub mod value;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
