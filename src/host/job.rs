//! Per-job host capabilities: cancellation, platform, scratch space, progress.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Completion status reported back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessResult {
    #[default]
    Ok,
    Error,
}

/// Cooperative cancellation poll.
pub trait JobCancellation: Send + Sync {
    fn is_job_cancelled(&self) -> bool;
}

/// A shareable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl JobCancellation for CancellationFlag {
    fn is_job_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Operating system the host runs on.
pub trait Platform: Send + Sync {
    fn is_windows(&self) -> bool;
}

/// The platform this binary was built for.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentPlatform;

impl Platform for CurrentPlatform {
    fn is_windows(&self) -> bool {
        cfg!(target_os = "windows")
    }
}

/// Case-scoped temporary directory.
pub trait TempDirProvider: Send + Sync {
    fn temp_directory(&self) -> io::Result<PathBuf>;
}

/// Data source progress bar.
pub trait Progress {
    fn switch_to_indeterminate(&self);

    fn progress(&self, message: &str);
}
