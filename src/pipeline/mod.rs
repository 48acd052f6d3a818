//! Chrome Ingest Pipeline
//!
//! One job per data source: for each [`ArtifactGroup`] the profile databases
//! are located, staged to case scratch space, and queried.
//!
//! # Architecture
//!
//! ```text
//! FileLocator ──► StagingArea ──► ArtifactExtractor ──► ArtifactSink
//!   (search)        (copy)          (SQLite rows)         (host)
//! ```
//!
//! Failures stay inside the smallest unit they concern: a row, an artifact
//! kind, or a file. A host registry without one of the standard artifact
//! types only loses that kind.
//!
//! # Example
//!
//! ```rust,ignore
//! use chromeingest::pipeline::{ChromeIngestModule, IngestConfig};
//!
//! let module = ChromeIngestModule::new(host, IngestConfig::default())?;
//! let report = module.process(&source, &cancel, &progress);
//! assert_eq!(report.result(), ProcessResult::Ok);
//! ```

pub mod config;
mod extractor;
mod locator;
mod report;
mod staging;

pub use config::{IngestConfig, RowFailurePolicy};
pub use extractor::{ArtifactExtractor, Extraction};
pub use locator::FileLocator;
pub use report::{GroupReport, JobOutcome, JobReport, KindReport};
pub use staging::{StagedDatabase, StagingArea};

use crate::artifacts::ArtifactGroup;
use crate::base::ingesterror::IngestError;
use crate::host::{
    ArtifactTypes, DataSource, HostServices, IngestMessage, JobCancellation, Progress,
};

/// Final inbox message of a job.
pub const COMPLETION_MESSAGE: &str = "Chrome artifacts have been analyzed";

/// Data source ingest module for Chrome history, downloads and top sites.
pub struct ChromeIngestModule {
    host: HostServices,
    config: IngestConfig,
    locator: FileLocator,
    extractor: ArtifactExtractor,
}

impl ChromeIngestModule {
    pub fn new(host: HostServices, config: IngestConfig) -> Result<Self, IngestError> {
        config.validate()?;
        let locator = FileLocator::new(host.file_search.clone(), &config.profile_path_pattern);
        let extractor = ArtifactExtractor::new(&host, &config);
        Ok(Self {
            host,
            config,
            locator,
            extractor,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Database file name searched for by `group`.
    pub fn file_name(&self, group: ArtifactGroup) -> &str {
        match group {
            ArtifactGroup::History => &self.config.history_file_name,
            ArtifactGroup::TopSites => &self.config.top_sites_file_name,
        }
    }

    /// Run every artifact group against `source`.
    pub fn process(
        &self,
        source: &DataSource,
        cancel: &dyn JobCancellation,
        progress: &dyn Progress,
    ) -> JobReport {
        let log = self.host.log.as_ref();
        progress.switch_to_indeterminate();

        if self.config.require_windows_host && !self.host.platform.is_windows() {
            log.info("Not running on Windows so stopping process");
            return JobReport::with_outcome(JobOutcome::UnsupportedPlatform);
        }

        log.info("Starting process");
        let mut types = ArtifactTypes::default();
        let mut report = JobReport::default();

        match self.host.temp_dirs.temp_directory() {
            Ok(case_temp) => {
                let mut area = StagingArea::new(
                    &case_temp,
                    &self.config.scratch_dir_name,
                    source,
                    self.config.copy_buffer_size,
                )
                .keep_copies(self.config.keep_staged_copies);

                for group in ArtifactGroup::ALL {
                    if cancel.is_job_cancelled() {
                        report.outcome = JobOutcome::Cancelled;
                        break;
                    }
                    log.info(&group.to_string());
                    progress.progress(&group.to_string());

                    let (group_report, cancelled) =
                        self.run_group(group, source, &mut area, &mut types, cancel);
                    report.groups.push(group_report);
                    if cancelled {
                        report.outcome = JobOutcome::Cancelled;
                        break;
                    }
                }
                area.cleanup();
            }
            Err(e) => {
                log.error(&format!("Case temp directory unavailable: {}", e));
                for group in ArtifactGroup::ALL {
                    let mut group_report = GroupReport::new(group);
                    group_report.failures.push(e.to_string());
                    report.groups.push(group_report);
                }
            }
        }

        if report.outcome == JobOutcome::Cancelled {
            log.info("Job cancelled");
            return report;
        }

        log.info("Ending process");
        self.host
            .services
            .post_message(IngestMessage::data(&self.config.module_name, COMPLETION_MESSAGE));
        report
    }

    /// Stage every file of `group`, then extract each staged copy.
    ///
    /// Returns the group report and whether the job was cancelled.
    fn run_group(
        &self,
        group: ArtifactGroup,
        source: &DataSource,
        area: &mut StagingArea,
        types: &mut ArtifactTypes,
        cancel: &dyn JobCancellation,
    ) -> (GroupReport, bool) {
        let log = self.host.log.as_ref();
        let name = self.file_name(group);
        let mut report = GroupReport::new(group);

        let files = match self.locator.locate(source, name) {
            Ok(files) => files,
            Err(e) => {
                log.info(&format!("Could not find {} file: {}", name, e));
                report.failures.push(e.to_string());
                return (report, false);
            }
        };
        report.located = files.len();
        if files.is_empty() {
            log.info(&format!("No {} file found", name));
            return (report, false);
        }

        let mut staged = Vec::with_capacity(files.len());
        for file in &files {
            match area.stage(file, cancel) {
                Ok(Some(db)) => staged.push(db),
                Ok(None) => return (report, true),
                Err(e) => {
                    log.error(&format!("Could not stage {}: {}", file.path(), e));
                    report.failures.push(e.to_string());
                }
            }
        }
        report.staged = staged.len();

        for db in &staged {
            if cancel.is_job_cancelled() {
                return (report, true);
            }
            let extraction = self.extractor.extract(db, group.queries(), types, cancel);
            for kind in extraction.kinds {
                if let Some(total) = report.kind_mut(kind.kind) {
                    total.merge(kind);
                }
            }
            if extraction.cancelled {
                return (report, true);
            }
        }

        (report, false)
    }
}
