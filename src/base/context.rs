//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO and SQLite errors into context-rich `IngestError` variants.

use crate::base::ingesterror::IngestError;
use std::io;
use std::path::Path;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add scratch directory context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use chromeingest::base::context::IoResultExt;
    ///
    /// fs::create_dir_all(&dir).scratch_context(&dir)?;
    /// // Error: "could not create scratch directory /case/Temp/...: permission denied"
    /// ```
    fn scratch_context(self, path: &Path) -> Result<T, IngestError>;

    /// Add staging context (source file name, destination path) to an IO error.
    fn staging_context(self, name: &str, path: &Path) -> Result<T, IngestError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn scratch_context(self, path: &Path) -> Result<T, IngestError> {
        self.map_err(|source| IngestError::ScratchDir {
            path: path.to_path_buf(),
            source,
        })
    }

    fn staging_context(self, name: &str, path: &Path) -> Result<T, IngestError> {
        self.map_err(|source| IngestError::Staging {
            name: name.to_string(),
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Extension trait for adding context to SQLite Results.
pub trait SqlResultExt<T> {
    /// Add database path context to an open failure.
    fn open_context(self, path: &Path) -> Result<T, IngestError>;

    /// Add the SQL text to a prepare/step failure.
    fn query_context(self, sql: &str) -> Result<T, IngestError>;
}

impl<T> SqlResultExt<T> for Result<T, rusqlite::Error> {
    fn open_context(self, path: &Path) -> Result<T, IngestError> {
        self.map_err(|source| {
            if locked(&source) {
                IngestError::DatabaseLocked
            } else {
                IngestError::Open {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }

    fn query_context(self, sql: &str) -> Result<T, IngestError> {
        self.map_err(|source| {
            if locked(&source) {
                IngestError::DatabaseLocked
            } else {
                IngestError::Query {
                    sql: sql.to_string(),
                    source,
                }
            }
        })
    }
}

fn locked(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ffi::ErrorCode::DatabaseBusy
                || e.code == rusqlite::ffi::ErrorCode::DatabaseLocked
    )
}
