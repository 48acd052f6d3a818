//! Fixed queries against Chrome's profile databases.

use crate::artifacts::kind::{ArtifactKind, AttributeType, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maps one result column to one output attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub column: &'static str,
    pub attribute: AttributeType,
}

impl FieldSpec {
    pub fn value_type(&self) -> ValueType {
        self.attribute.value_type()
    }
}

/// A fixed (table, columns, output schema) query for one artifact kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySpec {
    pub kind: ArtifactKind,
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
}

pub const HISTORY: QuerySpec = QuerySpec {
    kind: ArtifactKind::WebHistory,
    table: "urls",
    fields: &[
        FieldSpec { column: "url", attribute: AttributeType::Url },
        FieldSpec { column: "title", attribute: AttributeType::Title },
        FieldSpec { column: "visit_count", attribute: AttributeType::Value },
    ],
};

pub const DOWNLOADS: QuerySpec = QuerySpec {
    kind: ArtifactKind::WebDownload,
    table: "downloads",
    fields: &[
        FieldSpec { column: "target_path", attribute: AttributeType::Path },
        FieldSpec { column: "end_time", attribute: AttributeType::DateTimeAccessed },
        FieldSpec { column: "tab_url", attribute: AttributeType::Url },
    ],
};

pub const TOP_SITES: QuerySpec = QuerySpec {
    kind: ArtifactKind::ChromeTopSites,
    table: "top_sites",
    fields: &[
        FieldSpec { column: "url", attribute: AttributeType::Url },
        FieldSpec { column: "url_rank", attribute: AttributeType::Value },
        FieldSpec { column: "title", attribute: AttributeType::Title },
    ],
};

impl QuerySpec {
    pub fn for_kind(kind: ArtifactKind) -> &'static QuerySpec {
        match kind {
            ArtifactKind::WebHistory => &HISTORY,
            ArtifactKind::WebDownload => &DOWNLOADS,
            ArtifactKind::ChromeTopSites => &TOP_SITES,
        }
    }

    /// `SELECT <columns> FROM <table>`
    pub fn sql(&self) -> String {
        let columns: Vec<&str> = self.fields.iter().map(|f| f.column).collect();
        format!("SELECT {} FROM {}", columns.join(", "), self.table)
    }
}

/// The databases this module reads, each feeding one or more queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactGroup {
    /// `History`: urls and downloads tables.
    History,
    /// `Top Sites`: top_sites table.
    TopSites,
}

impl ArtifactGroup {
    pub const ALL: [ArtifactGroup; 2] = [ArtifactGroup::History, ArtifactGroup::TopSites];

    pub fn queries(self) -> &'static [&'static QuerySpec] {
        match self {
            ArtifactGroup::History => &[&HISTORY, &DOWNLOADS],
            ArtifactGroup::TopSites => &[&TOP_SITES],
        }
    }
}

impl fmt::Display for ArtifactGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactGroup::History => f.write_str("Chrome History and Downloads"),
            ArtifactGroup::TopSites => f.write_str("Chrome Top Sites"),
        }
    }
}
