//! [`FileSearch`] over a directory where an image is mounted.

use crate::base::ingesterror::IngestError;
use crate::host::search::{DataSource, FileContent, FileSearch, LocatedFile, PathPattern};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Searches a read-only mount of the data source.
///
/// Parent paths are reported relative to the mount root with `/` separators
/// and a trailing slash, e.g. `/Users/bob/AppData/Local/Google/Chrome/User Data/Default/`.
/// Symbolic links are not followed.
#[derive(Debug)]
pub struct MountedImageSearch {
    root: PathBuf,
    next_id: AtomicU64,
}

impl MountedImageSearch {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk(
        &self,
        dir: &Path,
        relative: &str,
        name: &str,
        pattern: &PathPattern,
        found: &mut Vec<LocatedFile>,
    ) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                return;
            }
        };

        let mut entries: Vec<_> = entries.flatten().collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let entry_name = entry.file_name().to_string_lossy().to_string();

            if file_type.is_dir() {
                let child = format!("{}{}/", relative, entry_name);
                self.walk(&entry.path(), &child, name, pattern, found);
            } else if file_type.is_file()
                && entry_name.eq_ignore_ascii_case(name)
                && pattern.matches(relative)
            {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let content = Arc::new(DiskFile { path: entry.path() });
                found.push(LocatedFile::new(id, entry_name, relative, content));
            }
        }
    }
}

impl FileSearch for MountedImageSearch {
    fn find_files(
        &self,
        _source: &DataSource,
        name: &str,
        parent_pattern: &str,
    ) -> Result<Vec<LocatedFile>, IngestError> {
        if !self.root.is_dir() {
            return Err(IngestError::search(
                name,
                format!("mount root {} is not a directory", self.root.display()),
            ));
        }

        let pattern = PathPattern::new(parent_pattern);
        let mut found = Vec::new();
        self.walk(&self.root, "/", name, &pattern, &mut found);
        tracing::debug!(file = %name, count = found.len(), "mounted image search complete");
        Ok(found)
    }
}

struct DiskFile {
    path: PathBuf,
}

impl FileContent for DiskFile {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }

    fn size(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|m| m.len())
    }
}
