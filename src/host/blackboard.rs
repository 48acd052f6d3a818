//! Artifact storage, the artifact type registry, and ingest notifications.

use crate::artifacts::{ArtifactKind, Attribute};
use crate::base::ingesterror::IngestError;
use crate::host::search::LocatedFile;
use std::collections::HashMap;
use thiserror::Error;

/// Host identifier of an artifact type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactTypeId(pub i32);

/// Host identifier of a stored artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactId(pub u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("artifact type {0} already exists")]
    AlreadyExists(String),
    #[error("{0}")]
    Failed(String),
}

/// The host's artifact type registry.
pub trait ArtifactTypeRegistry: Send + Sync {
    fn artifact_type_id(&self, type_name: &str) -> Option<ArtifactTypeId>;

    fn add_artifact_type(
        &self,
        type_name: &str,
        display_name: &str,
    ) -> Result<ArtifactTypeId, RegistryError>;
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Where extracted artifacts go.
pub trait ArtifactSink: Send + Sync {
    /// Store one artifact of `type_id` on `file` with its attributes, in order.
    fn create_artifact(
        &self,
        file: &LocatedFile,
        type_id: ArtifactTypeId,
        attributes: &[Attribute],
    ) -> Result<ArtifactId, SinkError>;
}

/// "Artifacts of this kind changed" notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDataEvent {
    pub module_name: String,
    pub kind: ArtifactKind,
    pub type_id: ArtifactTypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Data,
    Info,
    Warning,
    Error,
}

/// A user-facing message for the host's ingest inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestMessage {
    pub message_type: MessageType,
    pub subject: String,
    pub detail: String,
}

impl IngestMessage {
    pub fn data(subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Data,
            subject: subject.into(),
            detail: detail.into(),
        }
    }
}

/// Host notification channels.
pub trait IngestServices: Send + Sync {
    fn fire_module_data_event(&self, event: ModuleDataEvent);

    fn post_message(&self, message: IngestMessage);
}

/// Host ids for the artifact kinds in use by a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactTypes {
    ids: HashMap<ArtifactKind, ArtifactTypeId>,
}

impl ArtifactTypes {
    pub fn get(&self, kind: ArtifactKind) -> Option<ArtifactTypeId> {
        self.ids.get(&kind).copied()
    }

    /// Id for `kind`, looked up on first use and cached.
    ///
    /// A standard kind the host lacks is an error for that kind only. A
    /// custom kind is registered first.
    pub fn ensure(
        &mut self,
        registry: &dyn ArtifactTypeRegistry,
        kind: ArtifactKind,
    ) -> Result<ArtifactTypeId, IngestError> {
        if let Some(id) = self.get(kind) {
            return Ok(id);
        }
        let id = if kind.is_custom() {
            ensure_registered(registry, kind)?
        } else {
            registry
                .artifact_type_id(kind.type_name())
                .ok_or(IngestError::UnknownArtifactType(kind.type_name()))?
        };
        self.ids.insert(kind, id);
        Ok(id)
    }
}

/// Register a custom kind with the host. Already registered is not an error.
pub fn ensure_registered(
    registry: &dyn ArtifactTypeRegistry,
    kind: ArtifactKind,
) -> Result<ArtifactTypeId, IngestError> {
    let info = kind.info();
    if let Some(id) = registry.artifact_type_id(info.type_name) {
        return Ok(id);
    }

    let registration_error = |message: String| IngestError::Registration {
        name: info.type_name,
        message,
    };

    match registry.add_artifact_type(info.type_name, info.display_name) {
        Ok(id) => Ok(id),
        Err(RegistryError::AlreadyExists(_)) => registry
            .artifact_type_id(info.type_name)
            .ok_or_else(|| registration_error("reported as existing but not found".into())),
        Err(RegistryError::Failed(message)) => Err(registration_error(message)),
    }
}
