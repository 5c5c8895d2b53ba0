//! Store error types.

use rusqlite::ErrorCode;

/// Errors produced by [`Store`](crate::Store) operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A commit rejected by a constraint that `INSERT OR IGNORE` does not
    /// absorb (foreign keys, mostly).
    #[error("constraint violation on '{table}': {message}")]
    Constraint { table: String, message: String },

    /// File-system I/O failure (e.g. creating the database directory).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify a failure raised while writing to `table`.
    pub fn from_write(table: &str, err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
                Error::Constraint {
                    table: table.to_string(),
                    message: msg.clone().unwrap_or_else(|| e.to_string()),
                }
            }
            _ => Error::Sqlite(err),
        }
    }

    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn is_constraint(&self) -> bool {
        match self {
            Error::Constraint { .. } => true,
            Error::Context { source, .. } => source.is_constraint(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_error_displays_context() {
        let inner = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(1),
            Some("no such table: stations".into()),
        );
        let err = Error::from_write("stations", inner);
        assert!(matches!(err, Error::Sqlite(_)));
        assert!(err.to_string().contains("sqlite"));
    }

    #[test]
    fn constraint_failures_are_classified() {
        let inner = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY),
            Some("FOREIGN KEY constraint failed".into()),
        );
        let err = Error::from_write("trips", inner).with_context("batch 3");
        assert!(err.is_constraint());
        assert!(err.to_string().starts_with("batch 3"));
    }

    #[test]
    fn io_error_wraps() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::Io(inner);
        assert!(err.to_string().contains("i/o"));
    }
}
