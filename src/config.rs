//! Run configuration
//!
//! [`Config`] is built once through [`ConfigBuilder`] and then shared by
//! reference with the walker, the diff engine and the chain controller. It is
//! never mutated after `build()`.
//!
//! ```rust
//! use difftree::config::{CompareMode, ConfigBuilder, DigestAlgorithm};
//!
//! # fn main() -> difftree::Result<()> {
//! let config = ConfigBuilder::new()
//!     .quick(true)
//!     .digest(Some(DigestAlgorithm::Sha256))
//!     .exclude("tmp/")
//!     .build()?;
//!
//! // Selecting a digest turns quick mode off
//! assert_eq!(config.compare_mode, CompareMode::Digest(DigestAlgorithm::Sha256));
//! assert_eq!(config.exclusions, vec!["/tmp".to_string()]);
//! # Ok(())
//! # }
//! ```

use crate::error::{DifftreeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Maximum byte length of a root argument (exclusive)
pub const MAX_PATH_LEN: usize = 4096;

/// Capacity of the first table in a chain
pub const DEFAULT_CAPACITY: usize = 52;

/// Content digest algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// MD5, 16-byte digests
    Md5,
    /// SHA-256, 32-byte digests
    Sha256,
}

impl DigestAlgorithm {
    /// Length of digests produced by this algorithm
    pub fn digest_len(&self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 16,
            DigestAlgorithm::Sha256 => 32,
        }
    }
}

/// Criteria used to decide whether a path present in both snapshots changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareMode {
    /// Kind, size, modification time, permissions and ownership
    Full,
    /// Kind, size and modification time only
    Quick,
    /// Kind and content digest
    Digest(DigestAlgorithm),
}

impl CompareMode {
    /// Digest algorithm in effect, if any
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        match self {
            CompareMode::Digest(algorithm) => Some(*algorithm),
            _ => None,
        }
    }
}

/// How directory entries are compared when present in both snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryPolicy {
    /// Match directories by path and kind only
    #[default]
    PresenceOnly,
    /// Apply the metadata criteria of the active mode; digest mode falls back to quick criteria
    Metadata,
}

/// Format of report lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// One human-readable line per event
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Where report lines are written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputTarget {
    /// Standard output
    #[default]
    Stdout,
    /// A file, created or truncated when the run starts
    File(PathBuf),
}

/// Immutable run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Comparison criteria
    pub compare_mode: CompareMode,
    /// Normalized excluded paths, each starting with `/`
    pub exclusions: Vec<String>,
    /// Directory comparison policy
    pub directory_policy: DirectoryPolicy,
    /// Report destination
    pub output: OutputTarget,
    /// Report line format
    pub format: ReportFormat,
    /// Root arguments must be strictly shorter than this many bytes
    pub max_path_len: usize,
    /// Capacity of the first table in the chain
    pub default_capacity: usize,
    /// Poll the stop flag between top-level entries of a root
    pub check_stop_in_walk: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compare_mode: CompareMode::Full,
            exclusions: Vec::new(),
            directory_policy: DirectoryPolicy::default(),
            output: OutputTarget::default(),
            format: ReportFormat::default(),
            max_path_len: MAX_PATH_LEN,
            default_capacity: DEFAULT_CAPACITY,
            check_stop_in_walk: true,
        }
    }
}

impl Config {
    /// Whether `path` equals an exclusion or lies beneath one
    ///
    /// `path` must already be normalized (leading `/`).
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclusions.iter().any(|excluded| {
            path == excluded
                || (path.starts_with(excluded.as_str())
                    && path.as_bytes().get(excluded.len()) == Some(&b'/'))
        })
    }
}

/// Builder for [`Config`]
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    quick: bool,
    digest: Option<DigestAlgorithm>,
    exclusions: Vec<String>,
    directory_policy: DirectoryPolicy,
    output: OutputTarget,
    format: ReportFormat,
    max_path_len: Option<usize>,
    default_capacity: Option<usize>,
    check_stop_in_walk: Option<bool>,
}

impl ConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare by kind, size and modification time only
    ///
    /// Ignored when a digest algorithm is selected.
    pub fn quick(mut self, quick: bool) -> Self {
        self.quick = quick;
        self
    }

    /// Select a content digest algorithm
    pub fn digest(mut self, algorithm: Option<DigestAlgorithm>) -> Self {
        self.digest = algorithm;
        self
    }

    /// Exclude a directory (or file) and everything beneath it
    ///
    /// The path is interpreted relative to each root; a leading separator is
    /// added when missing.
    pub fn exclude(mut self, path: impl Into<String>) -> Self {
        self.exclusions.push(path.into());
        self
    }

    /// Replace the exclusion list
    pub fn exclusions(mut self, paths: Vec<String>) -> Self {
        self.exclusions = paths;
        self
    }

    /// Set the directory comparison policy
    pub fn directory_policy(mut self, policy: DirectoryPolicy) -> Self {
        self.directory_policy = policy;
        self
    }

    /// Set the report destination
    pub fn output(mut self, output: OutputTarget) -> Self {
        self.output = output;
        self
    }

    /// Set the report line format
    pub fn format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Override the root path-length ceiling
    pub fn max_path_len(mut self, max: usize) -> Self {
        self.max_path_len = Some(max);
        self
    }

    /// Override the first table's capacity (coerced to at least 1)
    pub fn default_capacity(mut self, capacity: usize) -> Self {
        self.default_capacity = Some(capacity);
        self
    }

    /// Enable or disable stop polling between top-level entries
    pub fn check_stop_in_walk(mut self, enabled: bool) -> Self {
        self.check_stop_in_walk = Some(enabled);
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// - [`DifftreeError::InvalidConfiguration`] if an exclusion normalizes to
    ///   the root itself or the path-length ceiling is zero
    pub fn build(self) -> Result<Config> {
        let compare_mode = match self.digest {
            Some(algorithm) => {
                if self.quick {
                    debug!("Digest mode selected, disabling quick mode");
                }
                CompareMode::Digest(algorithm)
            }
            None if self.quick => CompareMode::Quick,
            None => CompareMode::Full,
        };

        let mut exclusions = Vec::with_capacity(self.exclusions.len());
        for raw in &self.exclusions {
            let normalized = normalize_exclusion(raw);
            if normalized == "/" {
                return Err(DifftreeError::invalid_config(format!(
                    "exclusion {:?} would exclude the entire root",
                    raw
                )));
            }
            if !exclusions.contains(&normalized) {
                exclusions.push(normalized);
            }
        }

        let max_path_len = self.max_path_len.unwrap_or(MAX_PATH_LEN);
        if max_path_len == 0 {
            return Err(DifftreeError::invalid_config("maximum path length must be positive"));
        }

        Ok(Config {
            compare_mode,
            exclusions,
            directory_policy: self.directory_policy,
            output: self.output,
            format: self.format,
            max_path_len,
            default_capacity: self.default_capacity.unwrap_or(DEFAULT_CAPACITY).max(1),
            check_stop_in_walk: self.check_stop_in_walk.unwrap_or(true),
        })
    }
}

/// Normalize an exclusion to the walker's path form
///
/// Adds a leading `/`, collapses repeated separators and trims trailing ones.
fn normalize_exclusion(raw: &str) -> String {
    let parts: Vec<String> = raw
        .split(['/', std::path::MAIN_SEPARATOR])
        .filter(|part| !part.is_empty() && *part != ".")
        .map(|part| part.replace('\\', "\\\\"))
        .collect();
    format!("/{}", parts.join("/"))
}
