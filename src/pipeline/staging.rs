//! Copies database files out of the image into case scratch space.
//!
//! SQLite needs a real file to open, so every located database is streamed to
//! `<case temp>/<scratch dir>/<data source id>/<file id>/<file name>`. The
//! image itself is only ever read.

use crate::base::context::IoResultExt;
use crate::base::ingesterror::IngestError;
use crate::host::{DataSource, JobCancellation, LocatedFile};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// A located file copied to local disk.
#[derive(Debug, Clone)]
pub struct StagedDatabase {
    pub file: LocatedFile,
    pub path: PathBuf,
    /// Bytes copied
    pub size: u64,
}

/// Scratch space of one data source for the duration of a job.
///
/// Staged copies are removed on [`StagingArea::cleanup`] or drop, unless the
/// area was told to keep them.
#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    buffer_size: usize,
    keep: bool,
    staged: Vec<StagedDatabase>,
}

impl StagingArea {
    pub fn new(
        case_temp: &Path,
        scratch_dir_name: &str,
        source: &DataSource,
        buffer_size: usize,
    ) -> Self {
        Self {
            root: case_temp
                .join(scratch_dir_name)
                .join(source.id.to_string()),
            buffer_size: buffer_size.max(1),
            keep: false,
            staged: Vec::new(),
        }
    }

    pub fn keep_copies(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    /// Per-data-source scratch directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, file: &LocatedFile) -> PathBuf {
        self.root.join(file.id().to_string()).join(file.name())
    }

    pub fn staged(&self) -> &[StagedDatabase] {
        &self.staged
    }

    /// Copy `file` to its scratch path.
    ///
    /// Returns `Ok(None)` when the job was cancelled before or during the
    /// copy; a partial copy is deleted. Staging a file twice returns the
    /// first copy.
    pub fn stage(
        &mut self,
        file: &LocatedFile,
        cancel: &dyn JobCancellation,
    ) -> Result<Option<StagedDatabase>, IngestError> {
        if cancel.is_job_cancelled() {
            return Ok(None);
        }
        if let Some(existing) = self.staged.iter().find(|s| s.file.id() == file.id()) {
            return Ok(Some(existing.clone()));
        }

        let path = self.path_for(file);
        let dir = path.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&dir).scratch_context(&dir)?;

        let copied = match self.copy(file, &path, cancel) {
            Ok(copied) => copied,
            Err(e) => {
                remove_partial(&path);
                return Err(e);
            }
        };
        let Some(size) = copied else {
            remove_partial(&path);
            tracing::debug!(file = %file.path(), "staging cancelled");
            return Ok(None);
        };

        tracing::debug!(file = %file.path(), dest = %path.display(), bytes = size, "staged database");
        let staged = StagedDatabase {
            file: file.clone(),
            path,
            size,
        };
        self.staged.push(staged.clone());
        Ok(Some(staged))
    }

    fn copy(
        &self,
        file: &LocatedFile,
        path: &Path,
        cancel: &dyn JobCancellation,
    ) -> Result<Option<u64>, IngestError> {
        let name = file.name();
        let mut reader = file.open().staging_context(name, path)?;
        let mut out = File::create(path).staging_context(name, path)?;
        let mut buf = vec![0u8; self.buffer_size];
        let mut total = 0u64;

        loop {
            if cancel.is_job_cancelled() {
                return Ok(None);
            }
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).staging_context(name, path),
            };
            out.write_all(&buf[..n]).staging_context(name, path)?;
            total += n as u64;
        }

        out.flush().staging_context(name, path)?;
        Ok(Some(total))
    }

    /// Remove every staged copy and the directories created for them.
    pub fn cleanup(&mut self) {
        if self.keep {
            self.staged.clear();
            return;
        }

        for staged in self.staged.drain(..) {
            if let Some(dir) = staged.path.parent() {
                if let Err(e) = fs::remove_dir_all(dir) {
                    tracing::warn!(path = %dir.display(), error = %e, "failed to remove staged copy");
                }
            }
        }
        // Only succeeds once nothing else lives there.
        let _ = fs::remove_dir(&self.root);
        if let Some(scratch) = self.root.parent() {
            let _ = fs::remove_dir(scratch);
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove partial copy");
        }
    }
}
