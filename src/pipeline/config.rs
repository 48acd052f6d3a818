//! Ingest module configuration.

use crate::artifacts::chromedb::{files, paths};
use crate::base::ingesterror::IngestError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What a row that cannot become an artifact does to the rest of its query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFailurePolicy {
    /// Log the row and continue with the next one, for every kind.
    #[default]
    SkipRow,
    /// As `SkipRow`, except that the first bad top-sites row abandons the
    /// remaining top-sites rows and suppresses their data event.
    LegacyTopSitesAbort,
}

/// Chrome ingest configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Source module name attached to every attribute and event.
    pub module_name: String,
    /// Directory under the case temp directory holding staged copies.
    pub scratch_dir_name: String,
    /// Parent-path pattern of the profile directories to search.
    pub profile_path_pattern: String,
    pub history_file_name: String,
    pub top_sites_file_name: String,
    pub row_failure_policy: RowFailurePolicy,
    /// Convert `end_time` from WebKit microseconds to Unix seconds.
    pub convert_webkit_timestamps: bool,
    /// Stop immediately when the host is not Windows.
    pub require_windows_host: bool,
    /// Leave staged databases in the case temp directory after the job.
    pub keep_staged_copies: bool,
    /// Staging copy chunk size in bytes
    pub copy_buffer_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            module_name: "Parse Windows Chrome".to_string(),
            scratch_dir_name: "chrome".to_string(),
            profile_path_pattern: paths::WINDOWS_DEFAULT_PROFILE.to_string(),
            history_file_name: files::HISTORY.to_string(),
            top_sites_file_name: files::TOP_SITES.to_string(),
            row_failure_policy: RowFailurePolicy::SkipRow,
            convert_webkit_timestamps: false,
            require_windows_host: true,
            keep_staged_copies: false,
            copy_buffer_size: 64 * 1024, // 64 KB
        }
    }
}

impl IngestConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, IngestError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| IngestError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| IngestError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        let names = [
            ("module_name", &self.module_name),
            ("scratch_dir_name", &self.scratch_dir_name),
            ("profile_path_pattern", &self.profile_path_pattern),
            ("history_file_name", &self.history_file_name),
            ("top_sites_file_name", &self.top_sites_file_name),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(IngestError::config(format!("{} must not be empty", key)));
            }
        }

        let single_components = [
            ("scratch_dir_name", &self.scratch_dir_name),
            ("history_file_name", &self.history_file_name),
            ("top_sites_file_name", &self.top_sites_file_name),
        ];
        for (key, value) in single_components {
            if value.contains(['/', '\\']) || value == ".." || value == "." {
                return Err(IngestError::config(format!(
                    "{} must be a single path component, got '{}'",
                    key, value
                )));
            }
        }

        if self.copy_buffer_size == 0 {
            return Err(IngestError::config("copy_buffer_size must be positive"));
        }
        Ok(())
    }

    /// Set the source module name.
    pub fn module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    /// Set the scratch directory name.
    pub fn scratch_dir_name(mut self, name: impl Into<String>) -> Self {
        self.scratch_dir_name = name.into();
        self
    }

    /// Set the profile parent-path pattern.
    pub fn profile_path_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.profile_path_pattern = pattern.into();
        self
    }

    pub fn history_file_name(mut self, name: impl Into<String>) -> Self {
        self.history_file_name = name.into();
        self
    }

    pub fn top_sites_file_name(mut self, name: impl Into<String>) -> Self {
        self.top_sites_file_name = name.into();
        self
    }

    /// Set the row failure policy.
    pub fn row_failure_policy(mut self, policy: RowFailurePolicy) -> Self {
        self.row_failure_policy = policy;
        self
    }

    /// Enable or disable WebKit timestamp conversion.
    pub fn convert_webkit_timestamps(mut self, enable: bool) -> Self {
        self.convert_webkit_timestamps = enable;
        self
    }

    pub fn require_windows_host(mut self, require: bool) -> Self {
        self.require_windows_host = require;
        self
    }

    pub fn keep_staged_copies(mut self, keep: bool) -> Self {
        self.keep_staged_copies = keep;
        self
    }

    /// Set the staging copy chunk size.
    pub fn copy_buffer_size(mut self, size: usize) -> Self {
        self.copy_buffer_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.module_name, "Parse Windows Chrome");
        assert_eq!(config.history_file_name, "History");
        assert_eq!(config.top_sites_file_name, "Top Sites");
        assert_eq!(config.row_failure_policy, RowFailurePolicy::SkipRow);
        assert!(!config.convert_webkit_timestamps);
        assert!(config.require_windows_host);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = IngestConfig::new()
            .module_name("Chrome (test)")
            .row_failure_policy(RowFailurePolicy::LegacyTopSitesAbort)
            .copy_buffer_size(16);

        assert_eq!(config.module_name, "Chrome (test)");
        assert_eq!(config.row_failure_policy, RowFailurePolicy::LegacyTopSitesAbort);
        assert_eq!(config.copy_buffer_size, 16);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = IngestConfig::from_json_str(
            r#"{"row_failure_policy": "legacy_top_sites_abort", "keep_staged_copies": true}"#,
        )
        .unwrap();
        assert_eq!(config.row_failure_policy, RowFailurePolicy::LegacyTopSitesAbort);
        assert!(config.keep_staged_copies);
        assert_eq!(config.scratch_dir_name, "chrome");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cases = [
            IngestConfig::new().module_name(" "),
            IngestConfig::new().history_file_name("Default/History"),
            IngestConfig::new().scratch_dir_name(".."),
            IngestConfig::new().copy_buffer_size(0),
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, IngestError::Config(_)), "{:?}", config);
        }
    }

    #[test]
    fn test_malformed_json() {
        let err = IngestConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chrome.json");
        fs::write(&path, r#"{"convert_webkit_timestamps": true}"#).unwrap();

        let config = IngestConfig::from_json_file(&path).unwrap();
        assert!(config.convert_webkit_timestamps);
        assert!(IngestConfig::from_json_file(dir.path().join("missing.json")).is_err());
    }
}
