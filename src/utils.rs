//! Utility functions for difftree
//!
//! ## Categories of Utilities
//!
//! ### Path Handling
//! - Normalizing root-relative paths to the `/a/b` key form used by tables
//!
//! ### File Metadata
//! - Extracting kind, size, modification time, permissions and ownership
//!   from `lstat` results (or followed results for a root)
//!
//! ### Content Digests
//! - Streaming MD5 / SHA-256 digests of file content
//! - Digests of symbolic link targets (the link itself, never what it points at)
//!
//! ### Formatting
//! - Human-readable byte counts for run summaries

use crate::config::DigestAlgorithm;
use crate::types::{ContentDigest, EntryKind};
use chrono::{DateTime, Utc};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path};

/// Read buffer size for content digests
const DIGEST_BUFFER_SIZE: usize = 8192;

/// Normalize a root-relative path to table key form
///
/// The result always begins with `/`, uses `/` as separator, and has no
/// empty, `.` or trailing components. An empty relative path (the root
/// itself) normalizes to `/`.
///
/// Names map to keys one-to-one: a backslash is written as `\\` and each
/// byte that is not part of valid UTF-8 as `\xNN`, so two distinct names
/// never share a key.
///
/// # Example
///
/// ```rust,ignore
/// use crate::utils::normalize_path;
/// use std::path::Path;
///
/// assert_eq!(normalize_path(Path::new("src/main.rs")), "/src/main.rs");
/// assert_eq!(normalize_path(Path::new("")), "/");
/// ```
pub fn normalize_path(relative: &Path) -> String {
    let mut normalized = String::with_capacity(relative.as_os_str().len() + 1);
    for component in relative.components() {
        if let Component::Normal(name) = component {
            normalized.push('/');
            push_escaped_name(&mut normalized, name);
        }
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

fn push_escaped_name(out: &mut String, name: &OsStr) {
    let bytes = os_bytes(name);
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            if c == '\\' {
                out.push_str("\\\\");
            } else {
                out.push(c);
            }
        }
        for byte in chunk.invalid() {
            out.push_str(&format!("\\x{:02X}", byte));
        }
    }
}

/// Metadata extracted for one entry
#[derive(Debug, Clone)]
pub struct EntryMetadata {
    /// Entry kind
    pub kind: EntryKind,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// Unix permission bits, when the platform has them
    pub permissions: Option<u32>,
    /// Owning user id, when the platform has one
    pub uid: Option<u32>,
    /// Owning group id, when the platform has one
    pub gid: Option<u32>,
}

impl EntryMetadata {
    /// Extract metadata from a `stat` or `lstat` result
    pub fn from_metadata(metadata: &fs::Metadata) -> io::Result<Self> {
        let (permissions, uid, gid) = ownership(metadata);
        Ok(Self {
            kind: EntryKind::from_file_type(metadata.file_type()),
            size: metadata.len(),
            modified: DateTime::<Utc>::from(metadata.modified()?),
            permissions,
            uid,
            gid,
        })
    }
}

#[cfg(unix)]
fn ownership(metadata: &fs::Metadata) -> (Option<u32>, Option<u32>, Option<u32>) {
    use std::os::unix::fs::MetadataExt;
    (
        Some(metadata.mode() & 0o7777),
        Some(metadata.uid()),
        Some(metadata.gid()),
    )
}

#[cfg(not(unix))]
fn ownership(metadata: &fs::Metadata) -> (Option<u32>, Option<u32>, Option<u32>) {
    // Map the read-only attribute onto owner write permission
    let mode = if metadata.permissions().readonly() { 0o444 } else { 0o644 };
    (Some(mode), None, None)
}

/// Compute the digest of `path` appropriate for its kind
///
/// Regular files digest their content, symlinks digest their target path.
/// Directories and other entries have no digest.
pub fn digest_entry(
    path: &Path,
    kind: EntryKind,
    algorithm: DigestAlgorithm,
) -> io::Result<Option<ContentDigest>> {
    match kind {
        EntryKind::File => {
            let file = File::open(path)?;
            digest_reader(file, algorithm).map(Some)
        }
        EntryKind::Symlink => {
            let target = fs::read_link(path)?;
            Ok(Some(digest_bytes(&os_bytes(target.as_os_str()), algorithm)))
        }
        EntryKind::Directory | EntryKind::Other => Ok(None),
    }
}

/// Digest everything readable from `reader`
pub fn digest_reader<R: Read>(reader: R, algorithm: DigestAlgorithm) -> io::Result<ContentDigest> {
    match algorithm {
        DigestAlgorithm::Md5 => {
            let output = stream_digest::<Md5, R>(reader)?;
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(&output);
            Ok(ContentDigest::Md5(bytes))
        }
        DigestAlgorithm::Sha256 => {
            let output = stream_digest::<Sha256, R>(reader)?;
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(&output);
            Ok(ContentDigest::Sha256(bytes))
        }
    }
}

/// Digest an in-memory byte slice
pub fn digest_bytes(data: &[u8], algorithm: DigestAlgorithm) -> ContentDigest {
    match algorithm {
        DigestAlgorithm::Md5 => {
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(&Md5::digest(data));
            ContentDigest::Md5(bytes)
        }
        DigestAlgorithm::Sha256 => {
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(&Sha256::digest(data));
            ContentDigest::Sha256(bytes)
        }
    }
}

fn stream_digest<D: Digest, R: Read>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; DIGEST_BUFFER_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_vec())
}

#[cfg(unix)]
fn os_bytes(value: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    value.as_bytes().to_vec()
}

#[cfg(not(unix))]
fn os_bytes(value: &OsStr) -> Vec<u8> {
    value.to_string_lossy().into_owned().into_bytes()
}

/// Format bytes in human-readable form
///
/// Uses binary units (1024-based).
///
/// ```rust,ignore
/// use crate::utils::format_bytes;
///
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
