//! Integration tests for difftree
//!
//! Multi-root chains over generated trees, exercising every comparison mode
//! and the error paths a real run meets.

use ::difftree::*;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

/// Fixed modification time so quick-mode comparisons are deterministic
pub const PINNED_MTIME: i64 = 1_700_000_000;

/// Test harness owning a set of sibling roots under one temporary directory
pub struct ChainHarness {
    pub base: TempDir,
    pub roots: Vec<PathBuf>,
}

impl ChainHarness {
    /// Create an empty harness
    pub fn new() -> Self {
        Self {
            base: TempDir::new().unwrap(),
            roots: Vec::new(),
        }
    }

    /// Add a root populated with `files`, every file and directory pinned to
    /// [`PINNED_MTIME`]
    pub fn add_root(&mut self, files: &[(&str, &str)]) -> PathBuf {
        let root = self.base.path().join(format!("root{}", self.roots.len()));
        fs::create_dir_all(&root).unwrap();
        for (path, content) in files {
            let full = root.join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&full, content).unwrap();
        }
        pin_tree(&root);
        self.roots.push(root.clone());
        root
    }

    /// Run the chain over every root added so far
    pub fn run(&self, config: Config) -> anyhow::Result<(MemorySink, ChainSummary)> {
        let mut sink = MemorySink::new();
        let summary = ChainController::new(config, RunState::new()).run(&self.roots, &mut sink)?;
        info!(
            "Harness chain over {} roots reported {} events",
            self.roots.len(),
            sink.events().len()
        );
        Ok((sink, summary))
    }
}

impl Default for ChainHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Pin the mtime of everything below `root` (children before parents)
pub fn pin_tree(root: &Path) {
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.path_is_symlink())
        .map(|e| e.into_path())
        .collect();
    paths.push(root.to_path_buf());
    for path in paths {
        set_file_mtime(&path, FileTime::from_unix_time(PINNED_MTIME, 0)).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_three_root_chain() {
        let mut harness = ChainHarness::new();
        harness.add_root(&[("f1", "1"), ("f2", "2")]);
        harness.add_root(&[("f2", "2"), ("f3", "3")]);
        harness.add_root(&[("f3", "3"), ("f4", "4")]);

        let (sink, summary) = harness.run(ConfigBuilder::new().quick(true).build().unwrap()).unwrap();

        assert_eq!(summary.roots_processed, 3);
        assert_eq!(summary.comparisons.len(), 2);
        assert_eq!(sink.paths(ChangeKind::Added), vec!["/f3", "/f4"]);
        assert_eq!(sink.paths(ChangeKind::Missing), vec!["/f1", "/f2"]);
        assert!(sink.paths(ChangeKind::Changed).is_empty());

        // Each event names the root whose walk produced it
        let roots: Vec<&PathBuf> = sink.events().iter().map(|e| &e.root).collect();
        assert_eq!(
            roots,
            vec![&harness.roots[1], &harness.roots[1], &harness.roots[2], &harness.roots[2]]
        );

        assert!(logs_contain("Walking"));
        assert!(logs_contain("Chain complete"));
    }

    #[test]
    fn test_quick_mode_detects_mtime_only_change() {
        let mut harness = ChainHarness::new();
        harness.add_root(&[("f", "same")]);
        let b = harness.add_root(&[("f", "same")]);
        set_file_mtime(b.join("f"), FileTime::from_unix_time(PINNED_MTIME + 60, 0)).unwrap();

        let (sink, _) = harness.run(ConfigBuilder::new().quick(true).build().unwrap()).unwrap();
        assert_eq!(sink.paths(ChangeKind::Changed), vec!["/f"]);
        assert!(matches!(
            sink.events()[0].differences.as_slice(),
            [Difference::Modified { .. }]
        ));

        // Digest mode only looks at content
        let (sink, _) = harness
            .run(ConfigBuilder::new().digest(Some(DigestAlgorithm::Md5)).build().unwrap())
            .unwrap();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_exclusions_apply_to_every_root() {
        let mut harness = ChainHarness::new();
        harness.add_root(&[("keep", "k"), ("tmp/a", "1"), ("tmp/sub/b", "2")]);
        harness.add_root(&[("keep", "k"), ("tmp/c", "3")]);

        let config = ConfigBuilder::new().quick(true).exclude("tmp/").build().unwrap();
        let (sink, summary) = harness.run(config).unwrap();

        assert!(sink.events().is_empty());
        assert!(!summary.total.has_changes());
    }

    #[test]
    fn test_directory_policy_metadata() {
        let mut harness = ChainHarness::new();
        harness.add_root(&[("d/f", "x")]);
        let b = harness.add_root(&[("d/f", "x")]);
        set_file_mtime(b.join("d"), FileTime::from_unix_time(PINNED_MTIME + 5, 0)).unwrap();

        let presence = ConfigBuilder::new().quick(true).build().unwrap();
        let (sink, _) = harness.run(presence).unwrap();
        assert!(sink.events().is_empty());

        let metadata = ConfigBuilder::new()
            .quick(true)
            .directory_policy(DirectoryPolicy::Metadata)
            .build()
            .unwrap();
        let (sink, _) = harness.run(metadata).unwrap();
        assert_eq!(sink.paths(ChangeKind::Changed), vec!["/d"]);
    }

    #[test]
    fn test_file_roots_compare_as_single_entries() {
        let mut harness = ChainHarness::new();
        let a = harness.base.path().join("one.txt");
        let b = harness.base.path().join("two.txt");
        fs::write(&a, "short").unwrap();
        fs::write(&b, "a bit longer").unwrap();
        harness.roots = vec![a, b];

        let (sink, _) = harness.run(ConfigBuilder::new().quick(true).build().unwrap()).unwrap();
        assert_eq!(sink.paths(ChangeKind::Changed), vec!["/"]);
    }

    #[test]
    fn test_json_report_lines() {
        let mut harness = ChainHarness::new();
        harness.add_root(&[("old", "o")]);
        harness.add_root(&[("new", "n")]);

        let config = ConfigBuilder::new().format(ReportFormat::Json).build().unwrap();
        let mut sink = WriterSink::new(Vec::new(), config.format);
        ChainController::new(config, RunState::new())
            .run(&harness.roots, &mut sink)
            .unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let events: Vec<ChangeEvent> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ChangeKind::Added);
        assert_eq!(events[0].path, "/new");
        assert_eq!(events[1].kind, ChangeKind::Missing);
        assert_eq!(events[1].path, "/old");
    }

    #[test]
    fn test_report_written_to_file_target() {
        let mut harness = ChainHarness::new();
        harness.add_root(&[("a", "1")]);
        harness.add_root(&[]);
        let out = harness.base.path().join("report.txt");

        let config = ConfigBuilder::new()
            .output(OutputTarget::File(out.clone()))
            .build()
            .unwrap();
        let mut sink = WriterSink::open(&config.output, config.format).unwrap();
        ChainController::new(config, RunState::new())
            .run(&harness.roots, &mut sink)
            .unwrap();
        drop(sink);

        assert_eq!(fs::read_to_string(out).unwrap(), "[missing] /a\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_target_change_in_digest_mode() {
        use std::os::unix::fs::symlink;

        let mut harness = ChainHarness::new();
        let a = harness.add_root(&[("target1", "t"), ("target2", "t")]);
        let b = harness.add_root(&[("target1", "t"), ("target2", "t")]);
        symlink("target1", a.join("link")).unwrap();
        symlink("target2", b.join("link")).unwrap();

        let config = ConfigBuilder::new()
            .digest(Some(DigestAlgorithm::Sha256))
            .build()
            .unwrap();
        let (sink, _) = harness.run(config).unwrap();
        assert_eq!(sink.paths(ChangeKind::Changed), vec!["/link"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_full_mode_detects_permission_change() {
        use std::os::unix::fs::PermissionsExt;

        let mut harness = ChainHarness::new();
        harness.add_root(&[("script.sh", "#!/bin/sh")]);
        let b = harness.add_root(&[("script.sh", "#!/bin/sh")]);
        fs::set_permissions(b.join("script.sh"), fs::Permissions::from_mode(0o755)).unwrap();
        fs::set_permissions(harness.roots[0].join("script.sh"), fs::Permissions::from_mode(0o644))
            .unwrap();

        let (sink, _) = harness.run(ConfigBuilder::new().build().unwrap()).unwrap();
        assert_eq!(sink.paths(ChangeKind::Changed), vec!["/script.sh"]);
        assert_eq!(
            sink.events()[0].differences,
            vec![Difference::Permissions {
                old: Some(0o644),
                new: Some(0o755)
            }]
        );

        let (sink, _) = harness.run(ConfigBuilder::new().quick(true).build().unwrap()).unwrap();
        assert!(sink.events().is_empty());
    }

    #[cfg(unix)]
    #[test]
    #[traced_test]
    fn test_unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let mut harness = ChainHarness::new();
        harness.add_root(&[("locked/inner", "i"), ("open", "o")]);
        let b = harness.add_root(&[("locked/inner", "i"), ("open", "o")]);
        fs::set_permissions(b.join("locked"), fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read the directory regardless of its mode
        if fs::read_dir(b.join("locked")).is_ok() {
            fs::set_permissions(b.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = harness.run(ConfigBuilder::new().quick(true).build().unwrap());
        fs::set_permissions(b.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();
        let (sink, _) = result.unwrap();

        assert_eq!(sink.paths(ChangeKind::Missing), vec!["/locked/inner"]);
        assert!(sink.paths(ChangeKind::Added).is_empty());
        assert!(logs_contain("skipping"));
    }
}
