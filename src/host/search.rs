//! File search over a data source.
//!
//! The host indexes the image; this module only describes what a search
//! returns ([`LocatedFile`]) and how parent-path patterns match.

use crate::base::ingesterror::IngestError;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

/// The forensic data source being scanned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataSource {
    /// Host object id; keys scratch paths so data sources never collide.
    pub id: u64,
    pub name: String,
}

impl DataSource {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Byte stream of a file inside the image.
pub trait FileContent: Send + Sync {
    /// Open a fresh reader positioned at the start of the file.
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;

    /// Size in bytes, when the host knows it.
    fn size(&self) -> Option<u64> {
        None
    }
}

/// A file found inside the image.
#[derive(Clone)]
pub struct LocatedFile {
    id: u64,
    name: String,
    parent_path: String,
    content: Arc<dyn FileContent>,
}

impl LocatedFile {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        parent_path: impl Into<String>,
        content: Arc<dyn FileContent>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            parent_path: parent_path.into(),
            content,
        }
    }

    /// Host object id of the file.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Container-relative parent directory, e.g. `/Users/bob/AppData/.../Default/`.
    pub fn parent_path(&self) -> &str {
        &self.parent_path
    }

    /// Parent path joined with the name.
    pub fn path(&self) -> String {
        if self.parent_path.ends_with('/') {
            format!("{}{}", self.parent_path, self.name)
        } else {
            format!("{}/{}", self.parent_path, self.name)
        }
    }

    pub fn size(&self) -> Option<u64> {
        self.content.size()
    }

    pub fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        self.content.open()
    }
}

impl fmt::Debug for LocatedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocatedFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent_path", &self.parent_path)
            .field("size", &self.content.size())
            .finish()
    }
}

/// Trait for searching files inside a data source.
///
/// Equivalent to the host file manager's `findFiles(dataSource, name, parent)`.
/// Implementations must be thread-safe.
pub trait FileSearch: Send + Sync {
    /// Files named `name` whose parent path matches `parent_pattern`
    /// (see [`PathPattern`]). An empty result means the file is absent.
    fn find_files(
        &self,
        source: &DataSource,
        name: &str,
        parent_pattern: &str,
    ) -> Result<Vec<LocatedFile>, IngestError>;
}

/// A parent-path pattern with SQL `LIKE` semantics.
///
/// `%` matches any run of characters and `_` a single character. Matching is
/// ASCII case-insensitive, treats `\` as `/`, and is a substring match: the
/// pattern may occur anywhere in the path, as the host's parent-path search
/// does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    tokens: Vec<char>,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Self {
        let mut tokens = vec!['%'];
        tokens.extend(normalize(pattern).chars());
        tokens.push('%');
        Self {
            raw: pattern.to_string(),
            tokens,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let text: Vec<char> = normalize(path).chars().collect();
        like(&self.tokens, &text)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").to_ascii_lowercase()
}

// Iterative LIKE with single-star backtracking.
fn like(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '_' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, from)) => {
                    p = star + 1;
                    t = from + 1;
                    backtrack = Some((star, from + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '%')
}
