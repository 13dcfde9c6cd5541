//! Directory listing entries
//!
//! A transport produces [`RemoteEntry`] values for one directory; the search
//! attaches the containing directory to produce a [`DirectoryEntry`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::join_remote_path;

/// Kind of a listed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link and the target it points at
    Link { target: String },
}

impl EntryKind {
    /// Whether the entry is a directory the search should descend into
    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// One entry as returned by a single directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Last modification time, if the server reported a parseable one
    pub modified: Option<DateTime<Utc>>,
}

impl RemoteEntry {
    /// Attach the directory this entry was listed from
    #[must_use]
    pub fn into_entry(self, path: &str) -> DirectoryEntry {
        DirectoryEntry {
            name: self.name,
            path: path.to_string(),
            kind: self.kind,
            size: self.size,
            modified: self.modified,
        }
    }
}

/// Metadata for a file, directory or link, including where it lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Entry name (no path separators)
    pub name: String,
    /// Absolute path of the containing directory
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl DirectoryEntry {
    /// Absolute path of the entry itself
    #[must_use]
    pub fn full_path(&self) -> String {
        join_remote_path(&self.path, &self.name)
    }
}
