//! # Difftree - Directory tree snapshot comparison
//!
//! Snapshot one or more directory trees and report what was added, changed
//! or went missing between each consecutive pair.
//!
//! ## Overview
//!
//! Difftree is built for integrity monitoring and backup verification:
//! - Snapshot a tree into an in-memory table keyed by root-relative path
//! - Compare a second tree against it while walking, reporting added and
//!   changed entries as they are found
//! - Report entries of the first tree that the second walk never matched
//! - Chain any number of roots: each root is compared against the previous
//!
//! ## Architecture
//!
//! - **PathTable**: path-keyed record store with a visible creation capacity
//!   and a per-record matched flag
//! - **TreeWalker**: depth-first walk that fills the successor table and marks
//!   predecessor records it finds
//! - **DiffEngine**: comparison rules, and the missing-entry pass over
//!   unmatched predecessor records
//! - **ChainController**: walks roots in order and hands each table off as the
//!   next predecessor, destroying it after its missing-entry pass
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use difftree::{ChainController, ChangeKind, ConfigBuilder, MemorySink, RunState};
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigBuilder::new().exclude("tmp").build()?;
//! let controller = ChainController::new(config, RunState::new());
//!
//! let mut sink = MemorySink::new();
//! controller.run(
//!     &[PathBuf::from("/backup/monday"), PathBuf::from("/backup/tuesday")],
//!     &mut sink,
//! )?;
//!
//! for path in sink.paths(ChangeKind::Missing) {
//!     println!("lost since monday: {}", path);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Comparison Modes
//!
//! - `Full` (default): kind, size, modification time, permissions, ownership
//! - `Quick`: kind, size, modification time
//! - `Digest`: kind and an MD5 or SHA-256 content digest
//!
//! Directories are matched by presence unless
//! [`DirectoryPolicy::Metadata`] is selected.
//!
//! ## Symbolic Links
//!
//! Symlinks are recorded as leaf entries and never followed. In digest mode
//! their digest covers the link target path.
//!
//! ## Module Organization
//!
//! - [`chain`]: multi-root driver
//! - [`config`]: run configuration and its builder
//! - [`diff`]: comparison rules and missing-entry detection
//! - [`error`]: error types and handling
//! - [`report`]: report sinks
//! - [`signals`]: stop and reload flags
//! - [`table`]: path-keyed snapshot table
//! - [`types`]: records and change events
//! - [`walker`]: recursive tree walker

pub mod chain;
pub mod config;
pub mod diff;
pub mod error;
pub mod report;
pub mod signals;
pub mod table;
pub mod types;
pub mod walker;

mod utils;

pub use chain::{ChainController, ChainSummary, Comparison};
pub use config::{CompareMode, Config, ConfigBuilder, DigestAlgorithm, DirectoryPolicy, OutputTarget, ReportFormat};
pub use diff::DiffEngine;
pub use error::{DifftreeError, Result};
pub use report::{MemorySink, ReportSink, WriterSink};
pub use signals::RunState;
pub use table::PathTable;
pub use types::*;
pub use walker::{TreeWalker, WalkSummary};

/// Format a byte count the way run summaries do
pub fn format_bytes(bytes: u64) -> String {
    utils::format_bytes(bytes)
}
