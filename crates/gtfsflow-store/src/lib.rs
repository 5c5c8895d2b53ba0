#![forbid(unsafe_code)]
//! gtfsflow-store: the embedded relational store every pipeline works on.
//!
//! - `store`: open + pragmas + fixed schema, row counts and scans.
//! - `guard`: scoped suspension of foreign-key enforcement.
//! - `batch`: the conflict-ignoring batch transaction helper.
//! - `value`: conversions between core `Value`s and SQLite values.

pub mod batch;
pub mod error;
pub mod guard;
pub mod schema;
pub mod store;
pub mod value;

pub use batch::{insert_sql, BatchInserter};
pub use error::{Error, Result};
pub use guard::IntegrityGuard;
pub use store::{Filter, Store};
