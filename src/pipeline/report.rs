//! What a job did, for hosts and tests that want more than `ProcessResult`.

use crate::artifacts::{ArtifactGroup, ArtifactKind};
use crate::host::ProcessResult;
use serde::Serialize;

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum JobOutcome {
    /// Every group ran, possibly with partial failures.
    #[default]
    Completed,
    /// The host cancelled the job; remaining work was skipped.
    Cancelled,
    /// The host is not Windows and the module is configured to require it.
    UnsupportedPlatform,
}

/// Per-kind totals across every database of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindReport {
    pub kind: ArtifactKind,
    /// Databases the query ran against.
    pub databases: usize,
    pub records: usize,
    pub skipped_rows: usize,
    /// Data-changed events fired.
    pub events: usize,
    /// A legacy top-sites abort happened.
    pub aborted: bool,
    pub failures: Vec<String>,
}

impl KindReport {
    pub fn new(kind: ArtifactKind) -> Self {
        Self {
            kind,
            databases: 0,
            records: 0,
            skipped_rows: 0,
            events: 0,
            aborted: false,
            failures: Vec::new(),
        }
    }

    pub fn merge(&mut self, other: KindReport) {
        self.databases += other.databases;
        self.records += other.records;
        self.skipped_rows += other.skipped_rows;
        self.events += other.events;
        self.aborted |= other.aborted;
        self.failures.extend(other.failures);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    pub group: ArtifactGroup,
    /// Files the locator returned.
    pub located: usize,
    pub staged: usize,
    /// Search and staging failures.
    pub failures: Vec<String>,
    pub kinds: Vec<KindReport>,
}

impl GroupReport {
    pub fn new(group: ArtifactGroup) -> Self {
        Self {
            group,
            located: 0,
            staged: 0,
            failures: Vec::new(),
            kinds: group
                .queries()
                .iter()
                .map(|q| KindReport::new(q.kind))
                .collect(),
        }
    }

    pub fn kind_mut(&mut self, kind: ArtifactKind) -> Option<&mut KindReport> {
        self.kinds.iter_mut().find(|k| k.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct JobReport {
    pub outcome: JobOutcome,
    pub groups: Vec<GroupReport>,
}

impl JobReport {
    pub fn with_outcome(outcome: JobOutcome) -> Self {
        Self {
            outcome,
            groups: Vec::new(),
        }
    }

    /// What the host is told. Failures are reported per kind and never
    /// fail the job.
    pub fn result(&self) -> ProcessResult {
        ProcessResult::Ok
    }

    pub fn group(&self, group: ArtifactGroup) -> Option<&GroupReport> {
        self.groups.iter().find(|g| g.group == group)
    }

    pub fn kind(&self, kind: ArtifactKind) -> Option<&KindReport> {
        self.groups
            .iter()
            .flat_map(|g| g.kinds.iter())
            .find(|k| k.kind == kind)
    }

    /// Records emitted for `kind`; zero when the kind never ran.
    pub fn records(&self, kind: ArtifactKind) -> usize {
        self.kind(kind).map_or(0, |k| k.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_lists_its_kinds() {
        let history = GroupReport::new(ArtifactGroup::History);
        let kinds: Vec<_> = history.kinds.iter().map(|k| k.kind).collect();
        assert_eq!(kinds, [ArtifactKind::WebHistory, ArtifactKind::WebDownload]);
    }

    #[test]
    fn test_merge_and_lookup() {
        let mut group = GroupReport::new(ArtifactGroup::TopSites);
        let mut a = KindReport::new(ArtifactKind::ChromeTopSites);
        a.records = 2;
        a.databases = 1;
        let mut b = KindReport::new(ArtifactKind::ChromeTopSites);
        b.records = 1;
        b.databases = 1;
        b.failures.push("locked".into());

        let kind = group.kind_mut(ArtifactKind::ChromeTopSites).unwrap();
        kind.merge(a);
        kind.merge(b);

        let report = JobReport {
            outcome: JobOutcome::Completed,
            groups: vec![group],
        };
        assert_eq!(report.records(ArtifactKind::ChromeTopSites), 3);
        assert_eq!(report.kind(ArtifactKind::ChromeTopSites).unwrap().databases, 2);
        assert_eq!(report.records(ArtifactKind::WebHistory), 0);
    }

    #[test]
    fn test_every_outcome_is_ok() {
        assert_eq!(JobReport::with_outcome(JobOutcome::Completed).result(), ProcessResult::Ok);
        assert_eq!(JobReport::with_outcome(JobOutcome::Cancelled).result(), ProcessResult::Ok);
        assert_eq!(
            JobReport::with_outcome(JobOutcome::UnsupportedPlatform).result(),
            ProcessResult::Ok
        );
    }
}
