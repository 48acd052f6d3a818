//! Base types and error handling.
//!
//! - [`IngestError`](ingesterror::IngestError): typed failures of an ingest job
//! - [`FailureTier`](ingesterror::FailureTier): how far a failure reaches
//! - [`context`]: extension traits attaching paths and SQL to IO/SQLite errors

pub mod context;
pub mod ingesterror;
