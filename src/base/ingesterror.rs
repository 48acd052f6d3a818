use crate::artifacts::ArtifactKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure classes of an ingest job.
///
/// Every [`IngestError`] belongs to exactly one tier, and the tier decides how
/// far the failure reaches: a file, an artifact kind, or a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTier {
    /// The target database is absent or the search could not run.
    NotFound,
    /// Scratch directory or staging copy failed. Aborts one file.
    Io,
    /// Database could not be opened or a query was rejected. Aborts one kind.
    OpenOrQuery,
    /// One row could not be turned into an artifact. Skips the row.
    Row,
    /// Artifact type registry problems. Aborts one kind.
    Setup,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file search for '{name}' failed: {message}")]
    Search { name: String, message: String },

    #[error("could not create scratch directory {}: {source}", path.display())]
    ScratchDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("staging '{name}' to {} failed: {source}", path.display())]
    Staging {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("query `{sql}` failed: {source}")]
    Query {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database is busy or locked")]
    DatabaseLocked,

    #[error("{kind} row {row}: column '{column}' {reason}")]
    RowConversion {
        kind: ArtifactKind,
        row: usize,
        column: &'static str,
        reason: String,
    },

    #[error("{kind} row {row}: artifact sink rejected the record: {message}")]
    Sink {
        kind: ArtifactKind,
        row: usize,
        message: String,
    },

    #[error("artifact type {0} is not known to the host registry")]
    UnknownArtifactType(&'static str),

    #[error("registering artifact type {name} failed: {message}")]
    Registration { name: &'static str, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl IngestError {
    pub fn search(name: impl Into<String>, message: impl Into<String>) -> Self {
        IngestError::Search {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn sink(kind: ArtifactKind, row: usize, message: impl Into<String>) -> Self {
        IngestError::Sink {
            kind,
            row,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        IngestError::Config(message.into())
    }

    pub fn as_tier(&self) -> FailureTier {
        match self {
            IngestError::Search { .. } => FailureTier::NotFound,
            IngestError::ScratchDir { .. } | IngestError::Staging { .. } => FailureTier::Io,
            IngestError::Open { .. } | IngestError::Query { .. } | IngestError::DatabaseLocked => {
                FailureTier::OpenOrQuery
            }
            IngestError::RowConversion { .. } | IngestError::Sink { .. } => FailureTier::Row,
            IngestError::UnknownArtifactType(_)
            | IngestError::Registration { .. }
            | IngestError::Config(_) => FailureTier::Setup,
        }
    }
}
