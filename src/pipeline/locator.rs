//! Finds profile databases inside a data source.

use crate::base::ingesterror::IngestError;
use crate::host::{DataSource, FileSearch, LocatedFile};
use std::sync::Arc;

/// Looks up database files by name below a parent-path pattern.
#[derive(Clone)]
pub struct FileLocator {
    search: Arc<dyn FileSearch>,
    parent_pattern: String,
}

impl FileLocator {
    pub fn new(search: Arc<dyn FileSearch>, parent_pattern: impl Into<String>) -> Self {
        Self {
            search,
            parent_pattern: parent_pattern.into(),
        }
    }

    pub fn parent_pattern(&self) -> &str {
        &self.parent_pattern
    }

    /// Every file named exactly `name` (ignoring case) in a matching profile.
    ///
    /// An empty result means the artifact is absent and is not an error.
    pub fn locate(
        &self,
        source: &DataSource,
        name: &str,
    ) -> Result<Vec<LocatedFile>, IngestError> {
        let mut files = self.search.find_files(source, name, &self.parent_pattern)?;

        // Hosts may answer with a prefix or LIKE match on the name.
        files.retain(|f| f.name().eq_ignore_ascii_case(name));
        files.sort_by_key(|f| f.id());
        files.dedup_by_key(|f| f.id());

        tracing::debug!(
            source = source.id,
            file = %name,
            count = files.len(),
            "located database files"
        );
        Ok(files)
    }
}
