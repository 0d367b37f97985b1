//! ContentProvider trait definition
//!
//! Any remote source that can list a directory and return the raw bytes of
//! a file can back the traversal. The GitHub adapter lives in its own crate;
//! tests use in-memory providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of a node in the remote tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Directory,
    File,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    /// Full path from the repository root, used for follow-up calls
    pub path: String,

    /// Last path component
    pub name: String,

    pub kind: ContentKind,
}

impl ContentEntry {
    /// Create a file entry, deriving the name from the path
    pub fn file(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path),
            path,
            kind: ContentKind::File,
        }
    }

    /// Create a directory entry, deriving the name from the path
    pub fn dir(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path),
            path,
            kind: ContentKind::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == ContentKind::Directory
    }
}

fn base_name(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}

/// Remote Content Provider
///
/// Implementations classify their failures into the core [`Error`](crate::Error)
/// taxonomy: `RateLimited`, `Unavailable` and `Network` are the signals the
/// resilience layer reacts to; everything else is treated as fatal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// List the entries of the directory at `path` (`/` is the root)
    async fn list_directory(&self, path: &str) -> Result<Vec<ContentEntry>>;

    /// Fetch the raw bytes of the file at `path`
    async fn get_raw_content(&self, path: &str) -> Result<Vec<u8>>;
}
