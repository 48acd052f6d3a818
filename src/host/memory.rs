//! In-memory host services.
//!
//! Stand-ins for the ingestion platform, for dry runs and tests: an image made
//! of byte buffers, a blackboard that records artifacts, and recording
//! notification and log channels.

use crate::artifacts::{ArtifactKind, ArtifactRecord, Attribute, AttributeValue};
use crate::base::ingesterror::IngestError;
use crate::host::blackboard::{
    ArtifactId, ArtifactSink, ArtifactTypeId, ArtifactTypeRegistry, IngestMessage,
    IngestServices, ModuleDataEvent, RegistryError, SinkError,
};
use crate::host::job::{Platform, Progress, TempDirProvider};
use crate::host::log::DiagnosticLog;
use crate::host::search::{DataSource, FileContent, FileSearch, LocatedFile, PathPattern};
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::Level;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// File content held in memory.
#[derive(Debug, Clone)]
pub struct MemoryContent {
    bytes: Arc<Vec<u8>>,
    opens: Arc<AtomicUsize>,
}

impl MemoryContent {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(bytes),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many readers have been opened.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl FileContent for MemoryContent {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Cursor::new(self.bytes.as_ref().clone())))
    }

    fn size(&self) -> Option<u64> {
        Some(self.bytes.len() as u64)
    }
}

/// Content whose reader fails after `good_bytes` bytes.
#[derive(Debug, Clone)]
pub struct FailingContent {
    pub good_bytes: usize,
}

impl FileContent for FailingContent {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(FailingReader {
            remaining: self.good_bytes,
        }))
    }
}

struct FailingReader {
    remaining: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "bad sector"));
        }
        let n = buf.len().min(self.remaining);
        buf[..n].fill(0xAB);
        self.remaining -= n;
        Ok(n)
    }
}

/// An image built from in-memory files, keyed by data source id.
#[derive(Default)]
pub struct MemoryImage {
    files: Mutex<Vec<(u64, LocatedFile)>>,
    next_id: AtomicUsize,
    failure: Option<String>,
    searches: AtomicUsize,
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// An image whose search service always fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn add_file(
        &self,
        source: &DataSource,
        parent_path: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> LocatedFile {
        self.add_content(source, parent_path, name, Arc::new(MemoryContent::new(bytes)))
    }

    pub fn add_content(
        &self,
        source: &DataSource,
        parent_path: &str,
        name: &str,
        content: Arc<dyn FileContent>,
    ) -> LocatedFile {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        let file = LocatedFile::new(id, name, parent_path, content);
        lock(&self.files).push((source.id, file.clone()));
        file
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

impl FileSearch for MemoryImage {
    fn find_files(
        &self,
        source: &DataSource,
        name: &str,
        parent_pattern: &str,
    ) -> Result<Vec<LocatedFile>, IngestError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(IngestError::search(name, message.clone()));
        }

        let pattern = PathPattern::new(parent_pattern);
        Ok(lock(&self.files)
            .iter()
            .filter(|(source_id, file)| {
                *source_id == source.id
                    && file.name().eq_ignore_ascii_case(name)
                    && pattern.matches(file.parent_path())
            })
            .map(|(_, file)| file.clone())
            .collect())
    }
}

/// An artifact as the blackboard stored it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub id: ArtifactId,
    pub file_id: u64,
    pub type_id: ArtifactTypeId,
    pub attributes: Vec<Attribute>,
}

#[derive(Default)]
struct BlackboardState {
    types: HashMap<String, (ArtifactTypeId, String)>,
    next_type_id: i32,
    artifacts: Vec<StoredArtifact>,
    registrations: usize,
}

/// Artifact sink and type registry backed by vectors.
#[derive(Default)]
pub struct MemoryBlackboard {
    state: Mutex<BlackboardState>,
    rejected: Vec<AttributeValue>,
    registration_failure: Option<String>,
}

impl MemoryBlackboard {
    /// A registry with no types at all.
    pub fn empty() -> Self {
        Self {
            state: Mutex::new(BlackboardState {
                next_type_id: 1,
                ..BlackboardState::default()
            }),
            ..Self::default()
        }
    }

    /// A registry that knows the host's standard kinds.
    pub fn with_standard_types() -> Self {
        let blackboard = Self::empty();
        {
            let mut state = lock(&blackboard.state);
            for kind in ArtifactKind::ALL.into_iter().filter(|k| !k.is_custom()) {
                let id = ArtifactTypeId(state.next_type_id);
                state.next_type_id += 1;
                state
                    .types
                    .insert(kind.type_name().to_string(), (id, kind.display_name().to_string()));
            }
        }
        blackboard
    }

    /// Reject every artifact carrying `value`.
    pub fn reject_value(mut self, value: AttributeValue) -> Self {
        self.rejected.push(value);
        self
    }

    /// Fail every type registration with `message`.
    pub fn fail_registrations(mut self, message: impl Into<String>) -> Self {
        self.registration_failure = Some(message.into());
        self
    }

    pub fn artifacts(&self) -> Vec<StoredArtifact> {
        lock(&self.state).artifacts.clone()
    }

    /// Stored artifacts of `kind`, in insertion order.
    pub fn records(&self, kind: ArtifactKind) -> Vec<ArtifactRecord> {
        let state = lock(&self.state);
        let Some((type_id, _)) = state.types.get(kind.type_name()) else {
            return Vec::new();
        };
        state
            .artifacts
            .iter()
            .filter(|a| a.type_id == *type_id)
            .map(|a| ArtifactRecord::from_attributes(kind, &a.attributes))
            .collect()
    }

    pub fn type_count(&self) -> usize {
        lock(&self.state).types.len()
    }

    /// Successful `add_artifact_type` calls.
    pub fn registration_count(&self) -> usize {
        lock(&self.state).registrations
    }
}

impl ArtifactTypeRegistry for MemoryBlackboard {
    fn artifact_type_id(&self, type_name: &str) -> Option<ArtifactTypeId> {
        lock(&self.state).types.get(type_name).map(|(id, _)| *id)
    }

    fn add_artifact_type(
        &self,
        type_name: &str,
        display_name: &str,
    ) -> Result<ArtifactTypeId, RegistryError> {
        if let Some(message) = &self.registration_failure {
            return Err(RegistryError::Failed(message.clone()));
        }

        let mut state = lock(&self.state);
        if state.types.contains_key(type_name) {
            return Err(RegistryError::AlreadyExists(type_name.to_string()));
        }
        let id = ArtifactTypeId(state.next_type_id);
        state.next_type_id += 1;
        state.registrations += 1;
        state
            .types
            .insert(type_name.to_string(), (id, display_name.to_string()));
        Ok(id)
    }
}

impl ArtifactSink for MemoryBlackboard {
    fn create_artifact(
        &self,
        file: &LocatedFile,
        type_id: ArtifactTypeId,
        attributes: &[Attribute],
    ) -> Result<ArtifactId, SinkError> {
        if let Some(bad) = attributes.iter().find(|a| self.rejected.contains(&a.value)) {
            return Err(SinkError(format!(
                "attribute {} rejected value '{}'",
                bad.attribute_type, bad.value
            )));
        }

        let mut state = lock(&self.state);
        let id = ArtifactId(state.artifacts.len() as u64 + 1);
        state.artifacts.push(StoredArtifact {
            id,
            file_id: file.id(),
            type_id,
            attributes: attributes.to_vec(),
        });
        Ok(id)
    }
}

/// Records data events and inbox messages.
#[derive(Debug, Default)]
pub struct MemoryServices {
    events: Mutex<Vec<ModuleDataEvent>>,
    messages: Mutex<Vec<IngestMessage>>,
}

impl MemoryServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ModuleDataEvent> {
        lock(&self.events).clone()
    }

    pub fn messages(&self) -> Vec<IngestMessage> {
        lock(&self.messages).clone()
    }
}

impl IngestServices for MemoryServices {
    fn fire_module_data_event(&self, event: ModuleDataEvent) {
        lock(&self.events).push(event);
    }

    fn post_message(&self, message: IngestMessage) {
        lock(&self.messages).push(message);
    }
}

/// Captures log lines.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        lock(&self.entries).clone()
    }

    /// Whether any line at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        lock(&self.entries)
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl DiagnosticLog for MemoryLog {
    fn log(&self, level: Level, message: &str) {
        lock(&self.entries).push((level, message.to_string()));
    }
}

/// A progress bar that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn switch_to_indeterminate(&self) {}

    fn progress(&self, _message: &str) {}
}

/// A platform check with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedPlatform {
    pub windows: bool,
}

impl Platform for FixedPlatform {
    fn is_windows(&self) -> bool {
        self.windows
    }
}

/// Always hands out the same case temp directory.
#[derive(Debug, Clone)]
pub struct StaticTempDir(pub PathBuf);

impl TempDirProvider for StaticTempDir {
    fn temp_directory(&self) -> io::Result<PathBuf> {
        Ok(self.0.clone())
    }
}
