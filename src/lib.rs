//! # chromeingest
//!
//! Chrome browser artifact extraction for forensic ingestion hosts.
//!
//! `chromeingest` finds the `History` and `Top Sites` databases of every
//! Chrome default profile inside a data source, copies them to case scratch
//! space, and reports their rows to the host as artifacts.
//!
//! ## Features
//!
//! - **Web History**: `urls` table as URL, title and visit count
//! - **Web Downloads**: `downloads` table as path, end time and tab URL
//! - **Chrome Top Sites**: `top_sites` table, registered as a custom artifact type
//! - **Pluggable Host**: file search, artifact storage and notifications are traits
//! - **Row Isolation**: a bad row, query or file never stops its siblings
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chromeingest::host::{CancellationFlag, DataSource, HostServices};
//! use chromeingest::host::memory::NoProgress;
//! use chromeingest::pipeline::{ChromeIngestModule, IngestConfig};
//!
//! let module = ChromeIngestModule::new(host, IngestConfig::from_json_file("chrome.json")?)?;
//! let report = module.process(&DataSource::new(1, "disk.e01"), &CancellationFlag::new(), &NoProgress);
//! println!("{} history records", report.records(ArtifactKind::WebHistory));
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error types and error context helpers
//! - [`artifacts`] - Artifact kinds, records and the fixed Chrome queries
//! - [`host`] - Traits for the ingestion host, plus in-memory and mounted-image implementations
//! - [`pipeline`] - Locating, staging and extracting, and the ingest module itself

pub mod artifacts;
pub mod base;
pub mod host;
pub mod pipeline;
