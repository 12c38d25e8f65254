//! Core data types used throughout the difftree library
//!
//! ## Overview
//!
//! - **Snapshot state**: [`FileRecord`], [`EntryKind`], [`ContentDigest`] describe
//!   one filesystem entry as captured during a walk
//! - **Reports**: [`ChangeKind`], [`ChangeEvent`], [`Difference`] describe one
//!   classification event emitted while comparing two snapshots
//! - **Statistics**: [`ChangeStats`] aggregates the events of a comparison
//!
//! ## Examples
//!
//! ```rust
//! use difftree::types::{ChangeKind, ChangeStats, ChangeEvent};
//! use std::path::PathBuf;
//!
//! let mut stats = ChangeStats::default();
//! stats.record(&ChangeEvent::new(ChangeKind::Added, "/etc/hosts", PathBuf::from("/b"), 120));
//! assert_eq!(stats.entries_added, 1);
//! assert!(stats.has_changes());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of a filesystem entry, classified without following symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (recorded as a leaf, never traversed)
    Symlink,
    /// Fifo, socket, block or character device
    Other,
}

impl EntryKind {
    /// Classify a `std::fs::FileType` obtained through `symlink_metadata`
    pub fn from_file_type(file_type: std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Content digest of an entry
///
/// The variant fixes the length: 16 bytes for MD5, 32 bytes for SHA-256.
/// A record carries at most one digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentDigest {
    /// MD5 digest
    Md5([u8; 16]),
    /// SHA-256 digest
    Sha256([u8; 32]),
}

impl ContentDigest {
    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ContentDigest::Md5(bytes) => bytes,
            ContentDigest::Sha256(bytes) => bytes,
        }
    }

    /// Digest length in bytes (16 or 32)
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Always false; present for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Lowercase hexadecimal rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One filesystem entry captured during a walk
///
/// `path` is relative to the walked root and always begins with `/`.
/// `matched` is transient: it is set on a predecessor record when the next
/// walk finds the same path, and read once by the missing-entry pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Normalized root-relative path with a leading separator
    pub path: String,
    /// Entry kind
    pub kind: EntryKind,
    /// Size in bytes as reported by the filesystem
    pub size: u64,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// Permission bits (Unix mode), when available
    pub permissions: Option<u32>,
    /// Owning user id, when available
    pub uid: Option<u32>,
    /// Owning group id, when available
    pub gid: Option<u32>,
    /// Content digest, present only in digest mode
    pub digest: Option<ContentDigest>,
    /// Set when a successor walk matched this path
    #[serde(skip)]
    pub matched: bool,
}

/// Classification of a reported entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present in the current root only
    Added,
    /// Present in both roots with differing comparison criteria
    Changed,
    /// Present in the previous root only
    Missing,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Added => "added",
            ChangeKind::Changed => "changed",
            ChangeKind::Missing => "missing",
        };
        f.write_str(name)
    }
}

/// A single criterion that differed between two records of the same path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "lowercase")]
pub enum Difference {
    /// Entry kind differs (e.g. file replaced by a directory)
    Kind { old: EntryKind, new: EntryKind },
    /// Size differs
    Size { old: u64, new: u64 },
    /// Modification time differs
    Modified { old: DateTime<Utc>, new: DateTime<Utc> },
    /// Permission bits differ
    Permissions { old: Option<u32>, new: Option<u32> },
    /// Owning user or group differs
    Owner {
        old: (Option<u32>, Option<u32>),
        new: (Option<u32>, Option<u32>),
    },
    /// Content digest differs
    Digest { old: Option<String>, new: Option<String> },
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::Kind { old, new } => write!(f, "kind {} -> {}", old, new),
            Difference::Size { old, new } => write!(f, "size {} -> {}", old, new),
            Difference::Modified { old, new } => {
                write!(f, "mtime {} -> {}", old.to_rfc3339(), new.to_rfc3339())
            }
            Difference::Permissions { old, new } => write!(
                f,
                "mode {} -> {}",
                old.map(|m| format!("{:o}", m)).unwrap_or_else(|| "-".into()),
                new.map(|m| format!("{:o}", m)).unwrap_or_else(|| "-".into())
            ),
            Difference::Owner { .. } => f.write_str("owner"),
            Difference::Digest { .. } => f.write_str("digest"),
        }
    }
}

/// One classification event emitted while comparing two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Classification
    pub kind: ChangeKind,
    /// Normalized path of the entry
    pub path: String,
    /// Root whose walk produced the event
    pub root: PathBuf,
    /// Size of the entry (current size for added/changed, last known for missing)
    pub size: u64,
    /// Criteria that differed; empty for added and missing entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub differences: Vec<Difference>,
}

impl ChangeEvent {
    /// Build an event without difference details
    pub fn new(kind: ChangeKind, path: impl Into<String>, root: PathBuf, size: u64) -> Self {
        Self {
            kind,
            path: path.into(),
            root,
            size,
            differences: Vec::new(),
        }
    }

    /// Attach the criteria that differed
    pub fn with_differences(mut self, differences: Vec<Difference>) -> Self {
        self.differences = differences;
        self
    }
}

/// Statistics about changes between snapshots
///
/// # Examples
///
/// ```rust
/// # use difftree::types::ChangeStats;
/// let stats = ChangeStats {
///     entries_added: 10,
///     entries_changed: 5,
///     entries_missing: 2,
///     bytes_added: 50000,
///     bytes_changed: 10000,
///     bytes_missing: 5000,
/// };
///
/// assert_eq!(stats.total_operations(), 17);
/// assert_eq!(stats.net_size_change(), 55000);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStats {
    /// Number of entries added
    pub entries_added: usize,
    /// Number of entries changed
    pub entries_changed: usize,
    /// Number of entries missing
    pub entries_missing: usize,
    /// Total size of added entries
    pub bytes_added: u64,
    /// Total size of changed entries (new size)
    pub bytes_changed: u64,
    /// Total size of missing entries
    pub bytes_missing: u64,
}

impl ChangeStats {
    /// Count one event
    pub fn record(&mut self, event: &ChangeEvent) {
        match event.kind {
            ChangeKind::Added => {
                self.entries_added += 1;
                self.bytes_added += event.size;
            }
            ChangeKind::Changed => {
                self.entries_changed += 1;
                self.bytes_changed += event.size;
            }
            ChangeKind::Missing => {
                self.entries_missing += 1;
                self.bytes_missing += event.size;
            }
        }
    }

    /// Add another comparison's statistics into this one
    pub fn merge(&mut self, other: &ChangeStats) {
        self.entries_added += other.entries_added;
        self.entries_changed += other.entries_changed;
        self.entries_missing += other.entries_missing;
        self.bytes_added += other.bytes_added;
        self.bytes_changed += other.bytes_changed;
        self.bytes_missing += other.bytes_missing;
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total_operations() > 0
    }

    /// Get total number of reported entries
    pub fn total_operations(&self) -> usize {
        self.entries_added + self.entries_changed + self.entries_missing
    }

    /// Get net size change in bytes
    ///
    /// Positive values indicate growth, negative values indicate shrinkage.
    pub fn net_size_change(&self) -> i64 {
        (self.bytes_added + self.bytes_changed) as i64 - self.bytes_missing as i64
    }
}
