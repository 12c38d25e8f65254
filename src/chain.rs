//! Multi-root comparison chain
//!
//! [`ChainController::run`] walks each root in argument order. The table of
//! root *n* is the predecessor for root *n + 1*: the walk of the successor
//! reports added and changed entries, the missing-entry pass over the
//! predecessor reports deletions, and the predecessor is then destroyed.
//! Exactly one predecessor and one successor table are alive at any time.
//!
//! The successor table is sized from the predecessor's entry count. The first
//! table uses [`Config::default_capacity`].
//!
//! Any fatal error ends the run immediately. Tables still alive at that point
//! are dropped on the way out and no further comparison is made.

use crate::config::Config;
use crate::diff::DiffEngine;
use crate::error::{DifftreeError, Result};
use crate::report::ReportSink;
use crate::signals::RunState;
use crate::table::PathTable;
use crate::types::ChangeStats;
use crate::walker::TreeWalker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of comparing one root against its predecessor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    /// Root the predecessor table was built from
    pub previous_root: PathBuf,
    /// Root walked against it
    pub current_root: PathBuf,
    /// Events reported for this pair
    pub stats: ChangeStats,
}

/// Outcome of a complete chain run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSummary {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Number of roots walked
    pub roots_processed: usize,
    /// One entry per consecutive pair of roots
    pub comparisons: Vec<Comparison>,
    /// Aggregate over every comparison
    pub total: ChangeStats,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl ChainSummary {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            roots_processed: 0,
            comparisons: Vec::new(),
            total: ChangeStats::default(),
            duration: Duration::ZERO,
        }
    }
}

/// Drives the walk/diff/handoff cycle over an ordered list of roots
///
/// ```rust,no_run
/// use difftree::{ChainController, ConfigBuilder, MemorySink, RunState};
/// use std::path::PathBuf;
///
/// # fn main() -> difftree::Result<()> {
/// let config = ConfigBuilder::new().quick(true).build()?;
/// let controller = ChainController::new(config, RunState::new());
///
/// let mut sink = MemorySink::new();
/// let roots = vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")];
/// let summary = controller.run(&roots, &mut sink)?;
/// println!("{} entries reported", summary.total.total_operations());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChainController {
    config: Config,
    state: RunState,
}

impl ChainController {
    /// Create a controller
    pub fn new(config: Config, state: RunState) -> Self {
        Self { config, state }
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared stop/reload state
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Walk `roots` in order, reporting each consecutive pair to `sink`
    ///
    /// A single root is walked without reporting anything. An empty list is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// - [`DifftreeError::PathTooLong`] if any root reaches the path-length
    ///   ceiling; checked for every root before the first walk
    /// - [`DifftreeError::RootAccess`] if a root cannot be stat'd or opened
    /// - [`DifftreeError::Allocation`] if a table cannot be allocated
    /// - [`DifftreeError::Interrupted`] if a stop request is observed
    /// - Sink errors are propagated
    pub fn run(&self, roots: &[PathBuf], sink: &mut dyn ReportSink) -> Result<ChainSummary> {
        let start = Instant::now();
        let mut summary = ChainSummary::new();

        self.validate_roots(roots)?;

        info!("Starting chain over {} roots", roots.len());

        let walker = TreeWalker::new(&self.config, &self.state);
        let mut previous: Option<(&Path, PathTable)> = None;

        for root in roots {
            self.checkpoint(sink)?;

            let capacity = previous
                .as_ref()
                .map(|(_, table)| table.len())
                .unwrap_or(self.config.default_capacity);
            let mut current = PathTable::with_capacity(capacity)?;

            let walk = walker.walk(
                root,
                &mut current,
                previous.as_mut().map(|(_, table)| table),
                sink,
            )?;

            if let Some((previous_root, mut previous_table)) = previous.take() {
                let missing = DiffEngine::report_missing(&previous_table, root, sink)?;
                previous_table.destroy();

                let mut stats = walk.stats;
                stats.merge(&missing);
                summary.total.merge(&stats);

                info!(
                    "Compared {:?} -> {:?}: {} added, {} changed, {} missing",
                    previous_root, root, stats.entries_added, stats.entries_changed, stats.entries_missing
                );
                summary.comparisons.push(Comparison {
                    previous_root: previous_root.to_path_buf(),
                    current_root: root.clone(),
                    stats,
                });
            }

            previous = Some((root.as_path(), current));
            summary.roots_processed += 1;
        }

        if let Some((_, mut last)) = previous.take() {
            last.destroy();
        }
        sink.flush()?;

        summary.duration = start.elapsed();
        info!(
            "Chain complete: {} roots, {} comparisons, {} entries reported in {:?}",
            summary.roots_processed,
            summary.comparisons.len(),
            summary.total.total_operations(),
            summary.duration
        );
        Ok(summary)
    }

    /// Check every root against the path-length ceiling
    ///
    /// Touches nothing on disk, so callers can run it before opening output.
    pub fn validate_roots(&self, roots: &[PathBuf]) -> Result<()> {
        for root in roots {
            let len = root.as_os_str().len();
            if len >= self.config.max_path_len {
                return Err(DifftreeError::PathTooLong {
                    path: root.clone(),
                    len,
                    max: self.config.max_path_len,
                });
            }
        }
        Ok(())
    }

    /// Between-roots checkpoint: honor stop and reload requests
    fn checkpoint(&self, sink: &mut dyn ReportSink) -> Result<()> {
        if self.state.should_stop() {
            info!("Stop requested, abandoning remaining roots");
            return Err(DifftreeError::Interrupted);
        }
        if self.state.take_reload() {
            info!("Reload requested, flushing report output");
            sink.flush()?;
        } else {
            debug!("Checkpoint clear");
        }
        Ok(())
    }
}
