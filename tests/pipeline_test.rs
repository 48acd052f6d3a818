//! End-to-end ingest jobs over in-memory and mounted images.

use chromeingest::artifacts::{ArtifactGroup, ArtifactKind, AttributeType};
use chromeingest::host::memory::{
    FailingContent, FixedPlatform, MemoryBlackboard, MemoryImage, MemoryLog, MemoryServices,
    NoProgress, StaticTempDir,
};
use chromeingest::host::{
    ArtifactTypeRegistry, CancellationFlag, DataSource, FileContent, HostServices, JobCancellation, MessageType,
    MountedImageSearch, ProcessResult, TempDirProvider,
};
use chromeingest::pipeline::{
    ChromeIngestModule, IngestConfig, JobOutcome, RowFailurePolicy, COMPLETION_MESSAGE,
};
use rusqlite::Connection;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tracing::Level;

const PROFILE_DIR: &str = "/Users/alice/AppData/Local/Google/Chrome/User Data/Default/";

const HISTORY_SQL: &str = "
    CREATE TABLE urls(id INTEGER PRIMARY KEY, url LONGVARCHAR, title LONGVARCHAR,
                      visit_count INTEGER DEFAULT 0 NOT NULL);
    CREATE TABLE downloads(id INTEGER PRIMARY KEY, target_path LONGVARCHAR,
                           end_time INTEGER NOT NULL, tab_url VARCHAR);
    INSERT INTO urls(url, title, visit_count) VALUES ('http://a.com', 'A', 3);
    INSERT INTO urls(url, title, visit_count) VALUES ('http://b.com', 'B', 0);
    INSERT INTO downloads(target_path, end_time, tab_url)
        VALUES ('/tmp/x.zip', 13300000000000000, 'http://a.com/x.zip');
";

const TOP_SITES_SQL: &str = "
    CREATE TABLE top_sites(url LONGVARCHAR, url_rank INTEGER, title LONGVARCHAR);
    INSERT INTO top_sites VALUES (x'00ff', 0, 'Broken');
    INSERT INTO top_sites VALUES ('http://good.com', 1, 'Good');
";

fn sqlite_bytes(sql: &str) -> Vec<u8> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fixture.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(sql).unwrap();
    drop(conn);
    std::fs::read(path).unwrap()
}

struct Job {
    image: Arc<MemoryImage>,
    blackboard: Arc<MemoryBlackboard>,
    services: Arc<MemoryServices>,
    log: Arc<MemoryLog>,
    temp: TempDir,
    windows: bool,
    temp_dirs: Option<Arc<dyn TempDirProvider>>,
}

impl Job {
    fn new() -> Self {
        Self::with_image(MemoryImage::new())
    }

    fn with_image(image: MemoryImage) -> Self {
        Self {
            image: Arc::new(image),
            blackboard: Arc::new(MemoryBlackboard::with_standard_types()),
            services: Arc::new(MemoryServices::new()),
            log: Arc::new(MemoryLog::new()),
            temp: tempdir().unwrap(),
            windows: true,
            temp_dirs: None,
        }
    }

    fn host(&self) -> HostServices {
        let temp_dirs: Arc<dyn TempDirProvider> = match &self.temp_dirs {
            Some(temp_dirs) => temp_dirs.clone(),
            None => Arc::new(StaticTempDir(self.temp.path().to_path_buf())),
        };
        HostServices::new(
            self.image.clone(),
            self.blackboard.clone(),
            self.blackboard.clone(),
            self.services.clone(),
            temp_dirs,
        )
        .with_platform(Arc::new(FixedPlatform {
            windows: self.windows,
        }))
        .with_log(self.log.clone())
    }

    fn module(&self, config: IngestConfig) -> ChromeIngestModule {
        ChromeIngestModule::new(self.host(), config).unwrap()
    }

    fn add_profile(&self, source: &DataSource) {
        self.image
            .add_file(source, PROFILE_DIR, "History", sqlite_bytes(HISTORY_SQL));
        self.image
            .add_file(source, PROFILE_DIR, "Top Sites", sqlite_bytes(TOP_SITES_SQL));
    }

    fn completion_messages(&self) -> usize {
        self.services
            .messages()
            .iter()
            .filter(|m| m.detail == COMPLETION_MESSAGE)
            .count()
    }
}

fn run(module: &ChromeIngestModule, source: &DataSource) -> chromeingest::pipeline::JobReport {
    module.process(source, &CancellationFlag::new(), &NoProgress)
}

#[test]
fn test_full_job() {
    let job = Job::new();
    let source = DataSource::new(1, "laptop.e01");
    job.add_profile(&source);

    let report = run(&job.module(IngestConfig::default()), &source);

    assert_eq!(report.result(), ProcessResult::Ok);
    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.records(ArtifactKind::WebHistory), 2);
    assert_eq!(report.records(ArtifactKind::WebDownload), 1);
    assert_eq!(report.records(ArtifactKind::ChromeTopSites), 1);
    assert_eq!(report.kind(ArtifactKind::ChromeTopSites).unwrap().skipped_rows, 1);

    assert_eq!(job.blackboard.records(ArtifactKind::WebHistory).len(), 2);
    assert_eq!(job.blackboard.records(ArtifactKind::ChromeTopSites).len(), 1);

    let kinds: Vec<_> = job.services.events().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        [ArtifactKind::WebHistory, ArtifactKind::WebDownload, ArtifactKind::ChromeTopSites]
    );

    let messages = job.services.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].message_type, MessageType::Data);
    assert_eq!(messages[0].detail, COMPLETION_MESSAGE);
}

#[test]
fn test_staged_copies_removed_at_job_end() {
    let job = Job::new();
    let source = DataSource::new(1, "laptop.e01");
    job.add_profile(&source);

    run(&job.module(IngestConfig::default()), &source);

    assert!(!job.temp.path().join("chrome").exists());
}

#[test]
fn test_zero_files_is_not_a_failure() {
    let job = Job::new();
    let source = DataSource::new(1, "empty.e01");

    let report = run(&job.module(IngestConfig::default()), &source);

    assert_eq!(report.result(), ProcessResult::Ok);
    assert_eq!(report.group(ArtifactGroup::History).unwrap().located, 0);
    assert_eq!(report.group(ArtifactGroup::TopSites).unwrap().located, 0);
    assert!(job.blackboard.artifacts().is_empty());
    assert!(job.services.events().is_empty());
    assert_eq!(job.completion_messages(), 1);
    assert!(job.log.contains(Level::INFO, "No History file found"));
}

#[test]
fn test_unsupported_platform_does_not_touch_image() {
    let mut job = Job::new();
    job.windows = false;
    let source = DataSource::new(1, "laptop.e01");
    job.add_profile(&source);

    let report = run(&job.module(IngestConfig::default()), &source);

    assert_eq!(report.result(), ProcessResult::Ok);
    assert_eq!(report.outcome, JobOutcome::UnsupportedPlatform);
    assert_eq!(job.image.search_count(), 0);
    assert!(job.blackboard.artifacts().is_empty());
    assert!(job.services.messages().is_empty());
    assert!(job.log.contains(Level::INFO, "Not running on Windows so stopping process"));
}

#[test]
fn test_platform_check_can_be_disabled() {
    let mut job = Job::new();
    job.windows = false;
    let source = DataSource::new(1, "laptop.e01");
    job.add_profile(&source);

    let report = run(&job.module(IngestConfig::new().require_windows_host(false)), &source);

    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.records(ArtifactKind::WebHistory), 2);
}

#[test]
fn test_missing_standard_type_only_skips_its_kind() {
    let mut job = Job::new();
    let blackboard = MemoryBlackboard::empty();
    blackboard
        .add_artifact_type("TSK_WEB_HISTORY", "Web History")
        .unwrap();
    job.blackboard = Arc::new(blackboard);
    let source = DataSource::new(1, "laptop.e01");
    job.add_profile(&source);

    let report = run(&job.module(IngestConfig::default()), &source);

    assert_eq!(report.result(), ProcessResult::Ok);
    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.records(ArtifactKind::WebHistory), 2);
    assert_eq!(report.records(ArtifactKind::ChromeTopSites), 1);
    assert_eq!(report.records(ArtifactKind::WebDownload), 0);
    assert!(!report.kind(ArtifactKind::WebDownload).unwrap().failures.is_empty());
    assert!(job.log.contains(Level::ERROR, "TSK_WEB_DOWNLOAD"));
    assert_eq!(job.completion_messages(), 1);
}

#[test]
fn test_cancelled_before_start() {
    let job = Job::new();
    let source = DataSource::new(1, "laptop.e01");
    job.add_profile(&source);
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let report = job
        .module(IngestConfig::default())
        .process(&source, &cancel, &NoProgress);

    assert_eq!(report.result(), ProcessResult::Ok);
    assert_eq!(report.outcome, JobOutcome::Cancelled);
    assert!(job.blackboard.artifacts().is_empty());
    assert!(job.services.messages().is_empty());
}

/// Content that cancels the job once its first chunk has been read.
struct CancelOnRead {
    bytes: Vec<u8>,
    cancel: CancellationFlag,
}

impl FileContent for CancelOnRead {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        struct Reader {
            inner: Cursor<Vec<u8>>,
            cancel: CancellationFlag,
        }
        impl Read for Reader {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.cancel.cancel();
                self.inner.read(buf)
            }
        }
        Ok(Box::new(Reader {
            inner: Cursor::new(self.bytes.clone()),
            cancel: self.cancel.clone(),
        }))
    }
}

#[test]
fn test_cancelled_mid_copy() {
    let job = Job::new();
    let source = DataSource::new(1, "laptop.e01");
    let cancel = CancellationFlag::new();
    let first = job.image.add_content(
        &source,
        PROFILE_DIR,
        "History",
        Arc::new(CancelOnRead {
            bytes: sqlite_bytes(HISTORY_SQL),
            cancel: cancel.clone(),
        }),
    );
    job.image.add_file(
        &source,
        "/Users/bob/AppData/Local/Google/Chrome/User Data/Default/",
        "History",
        sqlite_bytes(HISTORY_SQL),
    );

    let config = IngestConfig::new().copy_buffer_size(512).keep_staged_copies(true);
    let report = job.module(config).process(&source, &cancel, &NoProgress);

    assert_eq!(report.outcome, JobOutcome::Cancelled);
    assert_eq!(report.result(), ProcessResult::Ok);
    assert!(job.blackboard.artifacts().is_empty());
    assert!(job.services.events().is_empty());
    assert!(job.services.messages().is_empty());

    let partial = job
        .temp
        .path()
        .join("chrome/1")
        .join(first.id().to_string())
        .join("History");
    assert!(!partial.exists());
    assert_eq!(report.group(ArtifactGroup::History).unwrap().staged, 0);
}

/// Cancels once the job has polled `after` times.
struct CancelAfter {
    after: usize,
    polls: std::sync::atomic::AtomicUsize,
}

impl JobCancellation for CancelAfter {
    fn is_job_cancelled(&self) -> bool {
        use std::sync::atomic::Ordering;
        self.polls.fetch_add(1, Ordering::SeqCst) >= self.after
    }
}

#[test]
fn test_cancellation_never_leaves_partial_artifacts() {
    let job = Job::new();
    let source = DataSource::new(1, "laptop.e01");
    job.add_profile(&source);

    for after in 0..40 {
        let blackboard = Arc::new(MemoryBlackboard::with_standard_types());
        let mut host = job.host();
        host.sink = blackboard.clone();
        host.registry = blackboard.clone();
        let module = ChromeIngestModule::new(host, IngestConfig::default()).unwrap();

        let cancel = CancelAfter {
            after,
            polls: Default::default(),
        };
        let report = module.process(&source, &cancel, &NoProgress);

        assert_eq!(report.result(), ProcessResult::Ok);
        for artifact in blackboard.artifacts() {
            assert_eq!(artifact.attributes.len(), 3);
        }
    }
}

#[test]
fn test_two_sources_do_not_collide() {
    let job = Job::new();
    let first = DataSource::new(1, "alice.e01");
    let second = DataSource::new(2, "bob.e01");
    let a = job
        .image
        .add_file(&first, PROFILE_DIR, "History", sqlite_bytes(HISTORY_SQL));
    let b = job.image.add_file(
        &second,
        PROFILE_DIR,
        "History",
        sqlite_bytes(
            "CREATE TABLE urls(url, title, visit_count);
             CREATE TABLE downloads(target_path, end_time, tab_url);
             INSERT INTO urls VALUES ('http://bob.com', 'Bob', 9);",
        ),
    );

    let module = job.module(IngestConfig::new().keep_staged_copies(true));
    run(&module, &first);
    run(&module, &second);

    let staged = |source: &DataSource, id: u64| -> PathBuf {
        job.temp
            .path()
            .join("chrome")
            .join(source.id.to_string())
            .join(id.to_string())
            .join("History")
    };
    assert!(staged(&first, a.id()).exists());
    assert!(staged(&second, b.id()).exists());
    assert_ne!(
        std::fs::read(staged(&first, a.id())).unwrap(),
        std::fs::read(staged(&second, b.id())).unwrap()
    );

    let urls: Vec<_> = job
        .blackboard
        .records(ArtifactKind::WebHistory)
        .into_iter()
        .filter_map(|r| r.text(AttributeType::Url).map(str::to_string))
        .collect();
    assert_eq!(urls, ["http://a.com", "http://b.com", "http://bob.com"]);
}

#[test]
fn test_every_profile_is_extracted() {
    let job = Job::new();
    let source = DataSource::new(1, "shared.e01");
    job.image
        .add_file(&source, PROFILE_DIR, "History", sqlite_bytes(HISTORY_SQL));
    job.image.add_file(
        &source,
        "/Users/bob/AppData/Local/Google/Chrome/User Data/Default/",
        "History",
        sqlite_bytes(HISTORY_SQL),
    );
    job.image.add_file(
        &source,
        "/Users/bob/AppData/Local/Google/Chrome/User Data/Profile 1/",
        "History",
        sqlite_bytes(HISTORY_SQL),
    );

    let report = run(&job.module(IngestConfig::default()), &source);

    let history = report.group(ArtifactGroup::History).unwrap();
    assert_eq!(history.located, 2);
    assert_eq!(history.staged, 2);
    assert_eq!(report.records(ArtifactKind::WebHistory), 4);
    assert_eq!(report.kind(ArtifactKind::WebHistory).unwrap().events, 2);
}

#[test]
fn test_history_failure_does_not_stop_top_sites() {
    let job = Job::new();
    let source = DataSource::new(1, "laptop.e01");
    job.image.add_file(
        &source,
        PROFILE_DIR,
        "History",
        b"definitely not a database, but long enough to have a header".to_vec(),
    );
    job.image
        .add_file(&source, PROFILE_DIR, "Top Sites", sqlite_bytes(TOP_SITES_SQL));

    let report = run(&job.module(IngestConfig::default()), &source);

    assert_eq!(report.result(), ProcessResult::Ok);
    assert_eq!(report.records(ArtifactKind::WebHistory), 0);
    assert!(!report.kind(ArtifactKind::WebHistory).unwrap().failures.is_empty());
    assert!(!report.kind(ArtifactKind::WebDownload).unwrap().failures.is_empty());
    assert_eq!(report.records(ArtifactKind::ChromeTopSites), 1);
    assert_eq!(job.completion_messages(), 1);
}

#[test]
fn test_staging_failure_only_skips_that_file() {
    let job = Job::new();
    let source = DataSource::new(1, "laptop.e01");
    job.image.add_content(
        &source,
        PROFILE_DIR,
        "History",
        Arc::new(FailingContent { good_bytes: 100 }),
    );
    job.image.add_file(
        &source,
        "/Users/bob/AppData/Local/Google/Chrome/User Data/Default/",
        "History",
        sqlite_bytes(HISTORY_SQL),
    );

    let report = run(&job.module(IngestConfig::default()), &source);

    let history = report.group(ArtifactGroup::History).unwrap();
    assert_eq!(history.located, 2);
    assert_eq!(history.staged, 1);
    assert_eq!(history.failures.len(), 1);
    assert_eq!(report.records(ArtifactKind::WebHistory), 2);
}

#[test]
fn test_search_failure_is_absent_artifact() {
    let job = Job::with_image(MemoryImage::failing("file index unavailable"));
    let source = DataSource::new(1, "laptop.e01");

    let report = run(&job.module(IngestConfig::default()), &source);

    assert_eq!(report.result(), ProcessResult::Ok);
    assert_eq!(report.group(ArtifactGroup::History).unwrap().failures.len(), 1);
    assert!(job.log.contains(Level::INFO, "Could not find History file"));
    assert_eq!(job.completion_messages(), 1);
}

struct NoTempDir;

impl TempDirProvider for NoTempDir {
    fn temp_directory(&self) -> io::Result<PathBuf> {
        Err(io::Error::new(io::ErrorKind::NotFound, "case closed"))
    }
}

#[test]
fn test_temp_dir_failure_skips_groups() {
    let mut job = Job::new();
    job.temp_dirs = Some(Arc::new(NoTempDir));
    let source = DataSource::new(1, "laptop.e01");
    job.add_profile(&source);

    let report = run(&job.module(IngestConfig::default()), &source);

    assert_eq!(report.result(), ProcessResult::Ok);
    assert!(job.blackboard.artifacts().is_empty());
    assert!(job.log.contains(Level::ERROR, "case closed"));
    assert_eq!(job.completion_messages(), 1);
}

#[test]
fn test_top_sites_registered_once_across_jobs() {
    let job = Job::new();
    let source = DataSource::new(1, "laptop.e01");
    job.add_profile(&source);

    let module = job.module(IngestConfig::default());
    run(&module, &source);
    run(&module, &source);

    assert_eq!(job.blackboard.registration_count(), 1);
    assert_eq!(job.blackboard.records(ArtifactKind::ChromeTopSites).len(), 2);
}

#[test]
fn test_legacy_policy_through_module() {
    let job = Job::new();
    let source = DataSource::new(1, "laptop.e01");
    job.add_profile(&source);

    let config = IngestConfig::new().row_failure_policy(RowFailurePolicy::LegacyTopSitesAbort);
    let report = run(&job.module(config), &source);

    let top_sites = report.kind(ArtifactKind::ChromeTopSites).unwrap();
    assert!(top_sites.aborted);
    assert_eq!(top_sites.records, 0);
    assert_eq!(top_sites.events, 0);
    assert_eq!(report.records(ArtifactKind::WebHistory), 2);
}

#[test]
fn test_invalid_config_rejected() {
    let job = Job::new();
    let err = ChromeIngestModule::new(job.host(), IngestConfig::new().copy_buffer_size(0));
    assert!(err.is_err());
}

fn mount_profile(root: &Path, user: &str) {
    let dir = root
        .join("Users")
        .join(user)
        .join("AppData/Local/Google/Chrome/User Data/Default");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("History"), sqlite_bytes(HISTORY_SQL)).unwrap();
    std::fs::write(dir.join("Top Sites"), sqlite_bytes(TOP_SITES_SQL)).unwrap();
}

#[test]
fn test_mounted_image() {
    let mount = tempdir().unwrap();
    mount_profile(mount.path(), "alice");
    mount_profile(mount.path(), "bob");

    let job = Job::new();
    let mut host = job.host();
    host.file_search = Arc::new(MountedImageSearch::new(mount.path()));
    let module = ChromeIngestModule::new(host, IngestConfig::default()).unwrap();

    let report = run(&module, &DataSource::new(5, "mounted"));

    assert_eq!(report.records(ArtifactKind::WebHistory), 4);
    assert_eq!(report.records(ArtifactKind::WebDownload), 2);
    assert_eq!(report.records(ArtifactKind::ChromeTopSites), 2);
    assert!(mount
        .path()
        .join("Users/alice/AppData/Local/Google/Chrome/User Data/Default/History")
        .exists());
}
