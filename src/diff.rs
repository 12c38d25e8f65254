//! Record comparison and missing-entry detection
//!
//! Two halves of the set difference between consecutive snapshots live here:
//!
//! - [`DiffEngine::compare`] decides whether a path present in both snapshots
//!   changed, according to the active [`CompareMode`] and [`DirectoryPolicy`].
//!   The walker calls it for every entry it finds in the predecessor table.
//! - [`DiffEngine::report_missing`] runs after the successor walk and reports
//!   every predecessor record whose matched flag was never set.
//!
//! ## Comparison rules
//!
//! | Mode     | Criteria                                        |
//! |----------|-------------------------------------------------|
//! | `Full`   | kind, size, mtime, permissions, uid/gid         |
//! | `Quick`  | kind, size, mtime                               |
//! | `Digest` | kind, content digest                            |
//!
//! Directories are matched by kind only under [`DirectoryPolicy::PresenceOnly`].
//! Under [`DirectoryPolicy::Metadata`] they use the active mode's metadata
//! criteria, with digest mode falling back to `Quick`. Entries of kind
//! `Other` are never opened, so digest mode compares them with `Quick` too.

use crate::config::{CompareMode, Config, DirectoryPolicy};
use crate::error::Result;
use crate::report::ReportSink;
use crate::table::PathTable;
use crate::types::{ChangeEvent, ChangeKind, ChangeStats, Difference, EntryKind, FileRecord};
use std::path::Path;
use tracing::debug;

/// Snapshot comparison engine
pub struct DiffEngine;

impl DiffEngine {
    /// Criteria that differ between two records of the same path
    ///
    /// An empty result means the entry is unchanged.
    pub fn compare(previous: &FileRecord, current: &FileRecord, config: &Config) -> Vec<Difference> {
        if previous.kind != current.kind {
            return vec![Difference::Kind {
                old: previous.kind,
                new: current.kind,
            }];
        }

        let mode = match (current.kind, config.directory_policy, config.compare_mode) {
            (EntryKind::Directory, DirectoryPolicy::PresenceOnly, _) => return Vec::new(),
            (EntryKind::Directory, DirectoryPolicy::Metadata, CompareMode::Digest(_)) => {
                CompareMode::Quick
            }
            (EntryKind::Other, _, CompareMode::Digest(_)) => CompareMode::Quick,
            (_, _, mode) => mode,
        };

        let mut differences = Vec::new();
        match mode {
            CompareMode::Digest(_) => {
                if previous.digest != current.digest {
                    differences.push(Difference::Digest {
                        old: previous.digest.map(|d| d.to_hex()),
                        new: current.digest.map(|d| d.to_hex()),
                    });
                }
            }
            CompareMode::Quick | CompareMode::Full => {
                if previous.size != current.size {
                    differences.push(Difference::Size {
                        old: previous.size,
                        new: current.size,
                    });
                }
                if previous.modified != current.modified {
                    differences.push(Difference::Modified {
                        old: previous.modified,
                        new: current.modified,
                    });
                }
                if mode == CompareMode::Full {
                    if previous.permissions != current.permissions {
                        differences.push(Difference::Permissions {
                            old: previous.permissions,
                            new: current.permissions,
                        });
                    }
                    if previous.uid != current.uid || previous.gid != current.gid {
                        differences.push(Difference::Owner {
                            old: (previous.uid, previous.gid),
                            new: (current.uid, current.gid),
                        });
                    }
                }
            }
        }
        differences
    }

    /// Report every record of `previous` that the successor walk never matched
    ///
    /// `current_root` is the root whose walk just completed; it is attached to
    /// each event. Events are emitted in path order.
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    pub fn report_missing(
        previous: &PathTable,
        current_root: &Path,
        sink: &mut dyn ReportSink,
    ) -> Result<ChangeStats> {
        let mut unmatched: Vec<&FileRecord> = Vec::new();
        previous.traverse(|record| {
            if !record.matched {
                unmatched.push(record);
            }
        });
        unmatched.sort_unstable_by(|a, b| a.path.cmp(&b.path));

        let mut stats = ChangeStats::default();
        for record in unmatched {
            let event = ChangeEvent::new(
                ChangeKind::Missing,
                record.path.clone(),
                current_root.to_path_buf(),
                record.size,
            );
            stats.record(&event);
            sink.report(&event)?;
        }

        debug!(
            "Missing-entry pass over {} records reported {} missing",
            previous.len(),
            stats.entries_missing
        );
        Ok(stats)
    }
}
