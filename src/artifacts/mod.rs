//! Artifact kinds, records and the fixed Chrome queries.
//!
//! | Kind | Database | Table | Output attributes |
//! |------|----------|-------|-------------------|
//! | [`ArtifactKind::WebHistory`] | `History` | `urls` | `TSK_URL`, `TSK_TITLE`, `TSK_VALUE` |
//! | [`ArtifactKind::WebDownload`] | `History` | `downloads` | `TSK_PATH`, `TSK_DATETIME_ACCESSED`, `TSK_URL` |
//! | [`ArtifactKind::ChromeTopSites`] | `Top Sites` | `top_sites` | `TSK_URL`, `TSK_VALUE`, `TSK_TITLE` |

pub mod chromedb;
pub mod kind;
pub mod query;
pub mod record;

pub use kind::{ArtifactKind, ArtifactTypeInfo, AttributeType, ValueType, ARTIFACT_TYPES};
pub use query::{ArtifactGroup, FieldSpec, QuerySpec};
pub use record::{ArtifactRecord, Attribute, AttributeValue};
