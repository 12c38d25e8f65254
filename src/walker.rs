//! Recursive tree walker
//!
//! [`TreeWalker`] populates a [`PathTable`] with one [`FileRecord`] per entry
//! reachable under a root, and, when a predecessor table is supplied,
//! classifies each entry against it as it goes.
//!
//! ## Walk order and classification
//!
//! The walk is depth-first, visiting siblings in file-name order. For every
//! entry:
//!
//! 1. The path relative to the root is normalized to `/a/b` form
//! 2. Excluded paths are skipped together with their subtree
//! 3. Metadata is read without following symlinks; symlinks are leaves
//! 4. In digest mode, the content digest is computed
//! 5. Against a predecessor: an unknown path is **added**; a known path is
//!    compared with [`DiffEngine::compare`] and reported **changed** when any
//!    criterion differs. Either way the predecessor record is marked matched
//! 6. The record is inserted into the current table
//!
//! Added and changed events are streamed to the sink as they are found.
//!
//! ## Errors
//!
//! Failing to stat or open the root is fatal ([`DifftreeError::RootAccess`]).
//! Any failure on an individual entry is logged, the entry is skipped and
//! the walk continues. An entry skipped this way has no record, so if the
//! predecessor had it, the missing-entry pass will report it.
//!
//! ## Roots that are not directories
//!
//! A file (or symlink, or other non-directory) given as a root is recorded as
//! a single entry with path `/`. A directory root contributes only its
//! descendants.

use crate::config::Config;
use crate::diff::DiffEngine;
use crate::error::{DifftreeError, Result};
use crate::report::ReportSink;
use crate::signals::RunState;
use crate::table::PathTable;
use crate::types::{ChangeEvent, ChangeKind, ChangeStats, FileRecord};
use crate::utils::{self, EntryMetadata};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

/// Outcome of walking one root
#[derive(Debug, Clone, Default)]
pub struct WalkSummary {
    /// Root that was walked
    pub root: PathBuf,
    /// Records inserted into the current table
    pub entries: usize,
    /// Total size of the recorded entries
    pub bytes: u64,
    /// Entries skipped because of I/O errors
    pub errors: usize,
    /// Entries skipped by an exclusion (subtree roots only)
    pub excluded: usize,
    /// Added and changed events emitted during the walk
    pub stats: ChangeStats,
    /// Wall-clock time of the walk
    pub duration: Duration,
}

/// Depth-first snapshot builder for one root at a time
pub struct TreeWalker<'a> {
    config: &'a Config,
    state: &'a RunState,
}

impl<'a> TreeWalker<'a> {
    /// Create a walker bound to a configuration and run state
    pub fn new(config: &'a Config, state: &'a RunState) -> Self {
        Self { config, state }
    }

    /// Walk `root`, filling `current` and classifying against `previous`
    ///
    /// When `previous` is `None` the walk only seeds `current`; nothing is
    /// reported.
    ///
    /// # Errors
    ///
    /// - [`DifftreeError::RootAccess`] if the root cannot be stat'd or opened
    /// - [`DifftreeError::Allocation`] if the table cannot grow
    /// - [`DifftreeError::Interrupted`] if a stop request is observed between
    ///   top-level entries
    /// - Sink errors are propagated
    pub fn walk(
        &self,
        root: &Path,
        current: &mut PathTable,
        mut previous: Option<&mut PathTable>,
        sink: &mut dyn ReportSink,
    ) -> Result<WalkSummary> {
        let start = Instant::now();
        let mut summary = WalkSummary {
            root: root.to_path_buf(),
            ..Default::default()
        };

        info!(
            "Walking {:?} (capacity hint {}, comparing: {})",
            root,
            current.capacity(),
            previous.is_some()
        );

        let root_metadata = fs::metadata(root).map_err(|source| DifftreeError::RootAccess {
            path: root.to_path_buf(),
            source,
        })?;

        if root_metadata.is_dir() {
            // Opening the root up front keeps an unreadable root fatal rather
            // than a per-entry warning
            fs::read_dir(root).map_err(|source| DifftreeError::RootAccess {
                path: root.to_path_buf(),
                source,
            })?;
            self.walk_directory(root, current, &mut previous, sink, &mut summary)?;
        } else {
            // A symlinked root is recorded as what it points at
            let metadata = EntryMetadata::from_metadata(&root_metadata).map_err(|source| {
                DifftreeError::RootAccess {
                    path: root.to_path_buf(),
                    source,
                }
            })?;
            match self.build_record(root, "/".to_string(), metadata) {
                Ok(record) => {
                    self.classify_and_insert(record, current, &mut previous, sink, &mut summary)?
                }
                Err(source) => {
                    return Err(DifftreeError::RootAccess {
                        path: root.to_path_buf(),
                        source,
                    })
                }
            }
        }

        summary.duration = start.elapsed();
        info!(
            "Walked {:?}: {} entries ({}) in {:?}, {} errors, {} excluded",
            root,
            summary.entries,
            utils::format_bytes(summary.bytes),
            summary.duration,
            summary.errors,
            summary.excluded
        );
        Ok(summary)
    }

    fn walk_directory(
        &self,
        root: &Path,
        current: &mut PathTable,
        previous: &mut Option<&mut PathTable>,
        sink: &mut dyn ReportSink,
        summary: &mut WalkSummary,
    ) -> Result<()> {
        let mut entries = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = entries.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(err) => {
                    if err.depth() == 0 {
                        return Err(DifftreeError::RootAccess {
                            path: root.to_path_buf(),
                            source: io::Error::from(err),
                        });
                    }
                    let path = err
                        .path()
                        .and_then(|p| p.strip_prefix(root).ok())
                        .map(utils::normalize_path)
                        .unwrap_or_else(|| "?".to_string());
                    self.entry_failed(path, io::Error::from(err), summary);
                    continue;
                }
            };

            if entry.depth() == 1 && self.config.check_stop_in_walk && self.state.should_stop() {
                info!("Stop requested while walking {:?}", root);
                return Err(DifftreeError::Interrupted);
            }

            let relative = match entry.path().strip_prefix(root) {
                Ok(relative) => relative,
                Err(_) => {
                    return Err(DifftreeError::internal(format!(
                        "walk yielded {:?} outside of root {:?}",
                        entry.path(),
                        root
                    )))
                }
            };
            let path = utils::normalize_path(relative);

            if self.config.is_excluded(&path) {
                debug!("Excluding {}", path);
                if entry.file_type().is_dir() {
                    entries.skip_current_dir();
                }
                summary.excluded += 1;
                continue;
            }

            // An entry without a record must not contribute descendants
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    if entry.file_type().is_dir() {
                        entries.skip_current_dir();
                    }
                    self.entry_failed(path, io::Error::from(err), summary);
                    continue;
                }
            };
            let metadata = match EntryMetadata::from_metadata(&metadata) {
                Ok(metadata) => metadata,
                Err(err) => {
                    if entry.file_type().is_dir() {
                        entries.skip_current_dir();
                    }
                    self.entry_failed(path, err, summary);
                    continue;
                }
            };

            match self.build_record(entry.path(), path.clone(), metadata) {
                Ok(record) => self.classify_and_insert(record, current, previous, sink, summary)?,
                Err(err) => self.entry_failed(path, err, summary),
            }
        }

        Ok(())
    }

    /// Assemble a record, computing the digest when the mode asks for one
    fn build_record(&self, fs_path: &Path, path: String, metadata: EntryMetadata) -> io::Result<FileRecord> {
        let digest = match self.config.compare_mode.digest_algorithm() {
            Some(algorithm) => utils::digest_entry(fs_path, metadata.kind, algorithm)?,
            None => None,
        };

        Ok(FileRecord {
            path,
            kind: metadata.kind,
            size: metadata.size,
            modified: metadata.modified,
            permissions: metadata.permissions,
            uid: metadata.uid,
            gid: metadata.gid,
            digest,
            matched: false,
        })
    }

    fn classify_and_insert(
        &self,
        record: FileRecord,
        current: &mut PathTable,
        previous: &mut Option<&mut PathTable>,
        sink: &mut dyn ReportSink,
        summary: &mut WalkSummary,
    ) -> Result<()> {
        if let Some(previous) = previous.as_deref_mut() {
            let event = match previous.match_record(&record.path) {
                None => Some(ChangeEvent::new(
                    ChangeKind::Added,
                    record.path.clone(),
                    summary.root.clone(),
                    record.size,
                )),
                Some(old) => {
                    let differences = DiffEngine::compare(old, &record, self.config);
                    if differences.is_empty() {
                        trace!("Unchanged: {}", record.path);
                        None
                    } else {
                        Some(
                            ChangeEvent::new(
                                ChangeKind::Changed,
                                record.path.clone(),
                                summary.root.clone(),
                                record.size,
                            )
                            .with_differences(differences),
                        )
                    }
                }
            };

            if let Some(event) = event {
                summary.stats.record(&event);
                sink.report(&event)?;
            }
        }

        summary.entries += 1;
        summary.bytes += record.size;
        if let Some(replaced) = current.insert(record)? {
            warn!("Duplicate path {} in one walk; keeping the later entry", replaced.path);
            summary.entries -= 1;
        }
        Ok(())
    }

    fn entry_failed(&self, path: String, source: io::Error, summary: &mut WalkSummary) {
        let err = DifftreeError::EntryAccess { path, source };
        warn!("{}, skipping", err);
        summary.errors += 1;
    }
}
