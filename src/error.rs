//! Error types for the difftree library
//!
//! Errors fall into two groups. Fatal errors (allocation failure, an
//! over-long root path, an unreadable root, an unsupported option) unwind to
//! the [`ChainController`](crate::chain::ChainController), which drops every
//! live table and aborts the run. Per-entry errors are logged by the walker,
//! the entry is skipped and the walk continues; they never leave the walker.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the difftree library
pub type Result<T> = std::result::Result<T, DifftreeError>;

/// Main error type for all difftree operations
#[derive(Debug, Error)]
pub enum DifftreeError {
    /// I/O errors outside of a walk (output sink, log file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors while encoding a JSON report line
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A table or record allocation failed
    #[error("Allocation failed: {0}")]
    Allocation(String),

    /// A root argument exceeds the path-length ceiling
    #[error("Argument too long: {len} bytes (maximum is {max}): {path:?}")]
    PathTooLong {
        /// The offending root argument
        path: PathBuf,
        /// Its length in bytes
        len: usize,
        /// Configured ceiling
        max: usize,
    },

    /// The root of a walk could not be opened or stat'd
    #[error("Cannot access root {path:?}: {source}")]
    RootAccess {
        /// Root that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A single entry inside a walk could not be read
    #[error("Cannot read entry {path}: {source}")]
    EntryAccess {
        /// Normalized path of the entry
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A requested feature is not supported
    #[error("Feature not currently supported: {0}")]
    UnsupportedFeature(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A stop request was observed at a checkpoint
    #[error("Run interrupted by stop request")]
    Interrupted,

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::collections::TryReserveError> for DifftreeError {
    fn from(err: std::collections::TryReserveError) -> Self {
        DifftreeError::Allocation(err.to_string())
    }
}

impl DifftreeError {
    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        DifftreeError::Internal(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        DifftreeError::InvalidConfiguration(msg.into())
    }

    /// Whether this error aborts the whole run
    ///
    /// Only [`DifftreeError::EntryAccess`] is absorbed by the walker; every
    /// other error ends the chain.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DifftreeError::EntryAccess { .. })
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            DifftreeError::Interrupted => 130,
            _ => 1,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            DifftreeError::PathTooLong { path, max, .. } => {
                format!(
                    "Argument too long: {:?}. Root paths must be shorter than {} bytes.",
                    path, max
                )
            }
            DifftreeError::RootAccess { path, source } => {
                format!(
                    "Unable to read {:?} ({}). Check that it exists and that you have permission to read it.",
                    path, source
                )
            }
            DifftreeError::UnsupportedFeature(feature) => {
                format!("{} is not currently supported. See --help for available options.", feature)
            }
            DifftreeError::Interrupted => {
                "Stopped before the chain completed; no further comparisons were made.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
