//! Host Collaborators
//!
//! The ingestion platform owns the case, the image index, artifact storage and
//! the job lifecycle. This module describes what the pipeline needs from it as
//! traits, so any host (or the in-memory one in [`memory`]) can drive it.
//!
//! # Architecture
//!
//! Every collaborator is a `Send + Sync` trait object collected in
//! [`HostServices`]. Per-job capabilities (cancellation, progress) are passed
//! to each `process` call instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use chromeingest::host::{HostServices, MountedImageSearch};
//! use chromeingest::host::memory::{MemoryBlackboard, MemoryServices, StaticTempDir};
//!
//! let blackboard = Arc::new(MemoryBlackboard::with_standard_types());
//! let host = HostServices::new(
//!     Arc::new(MountedImageSearch::new("/mnt/image")),
//!     blackboard.clone(),
//!     blackboard,
//!     Arc::new(MemoryServices::new()),
//!     Arc::new(StaticTempDir("/case/Temp".into())),
//! );
//! ```

mod blackboard;
mod job;
mod log;
pub mod memory;
mod mounted;
mod search;

pub use blackboard::{
    ensure_registered, ArtifactId, ArtifactSink, ArtifactTypeId, ArtifactTypeRegistry,
    ArtifactTypes, IngestMessage, IngestServices, MessageType, ModuleDataEvent, RegistryError,
    SinkError,
};
pub use job::{
    CancellationFlag, CurrentPlatform, JobCancellation, Platform, ProcessResult, Progress,
    TempDirProvider,
};
pub use log::{DiagnosticLog, TracingLog};
pub use mounted::MountedImageSearch;
pub use search::{DataSource, FileContent, FileSearch, LocatedFile, PathPattern};

use std::sync::Arc;

/// Long-lived collaborators shared by every job of a module instance.
#[derive(Clone)]
pub struct HostServices {
    pub file_search: Arc<dyn FileSearch>,
    pub sink: Arc<dyn ArtifactSink>,
    pub registry: Arc<dyn ArtifactTypeRegistry>,
    pub services: Arc<dyn IngestServices>,
    pub temp_dirs: Arc<dyn TempDirProvider>,
    pub platform: Arc<dyn Platform>,
    pub log: Arc<dyn DiagnosticLog>,
}

impl HostServices {
    /// Collaborators with the current platform and `tracing` logging.
    pub fn new(
        file_search: Arc<dyn FileSearch>,
        sink: Arc<dyn ArtifactSink>,
        registry: Arc<dyn ArtifactTypeRegistry>,
        services: Arc<dyn IngestServices>,
        temp_dirs: Arc<dyn TempDirProvider>,
    ) -> Self {
        Self {
            file_search,
            sink,
            registry,
            services,
            temp_dirs,
            platform: Arc::new(CurrentPlatform),
            log: Arc::new(TracingLog::default()),
        }
    }

    pub fn with_platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_log(mut self, log: Arc<dyn DiagnosticLog>) -> Self {
        self.log = log;
        self
    }
}
