//! Artifact and attribute kinds, and their host type names.
//!
//! The host registry is string keyed. Everything inside the crate uses the
//! closed enums below and only converts to names at the host boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Artifact kinds produced by this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    WebHistory,
    WebDownload,
    ChromeTopSites,
}

/// Host-facing description of an artifact kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactTypeInfo {
    pub kind: ArtifactKind,
    /// Registry key, e.g. `TSK_WEB_HISTORY`.
    pub type_name: &'static str,
    pub display_name: &'static str,
    /// Custom kinds must be registered by the module before use; standard
    /// kinds are expected to exist in the host already.
    pub custom: bool,
}

pub const ARTIFACT_TYPES: [ArtifactTypeInfo; 3] = [
    ArtifactTypeInfo {
        kind: ArtifactKind::WebHistory,
        type_name: "TSK_WEB_HISTORY",
        display_name: "Web History",
        custom: false,
    },
    ArtifactTypeInfo {
        kind: ArtifactKind::WebDownload,
        type_name: "TSK_WEB_DOWNLOAD",
        display_name: "Web Downloads",
        custom: false,
    },
    ArtifactTypeInfo {
        kind: ArtifactKind::ChromeTopSites,
        type_name: "TSK_CHROME_TOPSITES",
        display_name: "Chrome Top Sites",
        custom: true,
    },
];

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::WebHistory,
        ArtifactKind::WebDownload,
        ArtifactKind::ChromeTopSites,
    ];

    pub fn info(self) -> &'static ArtifactTypeInfo {
        match self {
            ArtifactKind::WebHistory => &ARTIFACT_TYPES[0],
            ArtifactKind::WebDownload => &ARTIFACT_TYPES[1],
            ArtifactKind::ChromeTopSites => &ARTIFACT_TYPES[2],
        }
    }

    pub fn type_name(self) -> &'static str {
        self.info().type_name
    }

    pub fn display_name(self) -> &'static str {
        self.info().display_name
    }

    pub fn is_custom(self) -> bool {
        self.info().custom
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        ARTIFACT_TYPES
            .iter()
            .find(|info| info.type_name == name)
            .map(|info| info.kind)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Value shape an attribute carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Integer,
}

/// Blackboard attribute types written by this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    Url,
    Title,
    /// Generic value slot; carries visit counts and site ranks.
    Value,
    Path,
    DateTimeAccessed,
}

impl AttributeType {
    pub fn type_name(self) -> &'static str {
        match self {
            AttributeType::Url => "TSK_URL",
            AttributeType::Title => "TSK_TITLE",
            AttributeType::Value => "TSK_VALUE",
            AttributeType::Path => "TSK_PATH",
            AttributeType::DateTimeAccessed => "TSK_DATETIME_ACCESSED",
        }
    }

    pub fn value_type(self) -> ValueType {
        match self {
            AttributeType::DateTimeAccessed => ValueType::Integer,
            _ => ValueType::Text,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
