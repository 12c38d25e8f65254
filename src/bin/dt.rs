//! # dt - compare directory trees
//!
//! Command-line front end for the difftree library.
//!
//! ## Usage
//! ```bash
//! # Compare two trees by size, mtime, permissions and ownership
//! dt /backup/monday /backup/tuesday
//!
//! # Compare by content, skipping tmp/ and cache/ under every root
//! dt -s -e tmp -e cache /srv/a /srv/b /srv/c
//!
//! # JSON lines to a file, with info-level diagnostics in /var/log
//! dt --json -w report.jsonl -d 1 -l /var/log /mnt/old /mnt/new
//! ```
//!
//! Exit status is 0 on a complete run, 130 when stopped by SIGINT/SIGTERM,
//! and 1 on any other failure.

use chrono::Utc;
use clap::{CommandFactory, Parser};
use colored::*;
use difftree::{
    ChainController, ChainSummary, ConfigBuilder, DifftreeError, DigestAlgorithm, DirectoryPolicy,
    OutputTarget, ReportFormat, Result, RunState, WriterSink,
};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Name of the diagnostic log file created under `--logdir`
const LOG_FILE_NAME: &str = "difftree.log";

/// Snapshot directory trees and report what changed between them
#[derive(Parser)]
#[command(name = "dt")]
#[command(version, disable_version_flag = true)]
#[command(about = "Report added, changed and missing files across directory trees")]
#[command(long_about = None)]
struct Cli {
    /// Diagnostic verbosity, 0 (warnings only) to 9 (trace)
    #[arg(short, long, value_name = "LEVEL", default_value_t = 0,
          value_parser = clap::value_parser!(u8).range(0..=9))]
    debug: u8,

    /// Exclude a directory (relative to each root); may be repeated
    #[arg(short = 'e', long = "exdir", value_name = "DIR")]
    exdir: Vec<String>,

    /// Read exclusions from a file (not supported)
    #[arg(short = 'E', long = "exfile", value_name = "FILE")]
    exfile: Option<PathBuf>,

    /// Write diagnostics to DIR/difftree.log instead of stderr
    #[arg(short, long, value_name = "DIR")]
    logdir: Option<PathBuf>,

    /// Compare file content with MD5 digests
    #[arg(short, long, conflicts_with = "sha256")]
    md5: bool,

    /// Compare file content with SHA-256 digests
    #[arg(short, long)]
    sha256: bool,

    /// Compare kind, size and modification time only
    #[arg(short, long)]
    quick: bool,

    /// Write the report to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    write: Option<PathBuf>,

    /// Emit one JSON object per report line
    #[arg(long)]
    json: bool,

    /// Also report directories whose metadata changed
    #[arg(long)]
    compare_dirs: bool,

    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Directory trees to compare, in order
    #[arg(required_unless_present = "exfile", value_name = "ROOT")]
    roots: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    if let Some(file) = &cli.exfile {
        let err = DifftreeError::UnsupportedFeature(format!("Exclusion file {:?} (-E)", file));
        eprintln!("{}: {}", "Error".red().bold(), err.user_message());
        let _ = Cli::command().print_help();
        std::process::exit(err.exit_code());
    }

    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(e.exit_code());
    }
}

/// Main runner
fn run(cli: Cli) -> Result<()> {
    init_logging(cli.debug, cli.logdir.as_deref())?;
    log_startup();

    let (controller, mut sink) = prepare(&cli, RunState::install())?;
    let summary = controller.run(&cli.roots, &mut sink)?;

    if cli.debug >= 1 && summary.roots_processed > 1 {
        print_summary(&summary);
    }
    Ok(())
}

/// Build the controller and open the report output
///
/// Roots are validated first so a rejected run leaves an existing `-w` file
/// untouched.
fn prepare(cli: &Cli, state: RunState) -> Result<(ChainController, WriterSink<Box<dyn Write>>)> {
    let digest = if cli.md5 {
        Some(DigestAlgorithm::Md5)
    } else if cli.sha256 {
        Some(DigestAlgorithm::Sha256)
    } else {
        None
    };
    let directory_policy = if cli.compare_dirs {
        DirectoryPolicy::Metadata
    } else {
        DirectoryPolicy::PresenceOnly
    };
    let format = if cli.json {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };

    let config = ConfigBuilder::new()
        .quick(cli.quick)
        .digest(digest)
        .exclusions(cli.exdir.clone())
        .directory_policy(directory_policy)
        .output(cli.write.clone().map(OutputTarget::File).unwrap_or_default())
        .format(format)
        .build()?;

    let controller = ChainController::new(config, state);
    controller.validate_roots(&cli.roots)?;
    let sink = WriterSink::open(&controller.config().output, controller.config().format)?;
    Ok((controller, sink))
}

/// Install the tracing subscriber for the requested verbosity
fn init_logging(debug: u8, logdir: Option<&Path>) -> Result<()> {
    let level = match debug {
        0 => LevelFilter::WARN,
        1..=2 => LevelFilter::INFO,
        3..=5 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    match logdir {
        Some(dir) => {
            let path = dir.join(LOG_FILE_NAME);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| {
                    DifftreeError::invalid_config(format!("cannot open log file {:?}: {}", path, e))
                })?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn log_startup() {
    let host = hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    let cwd = std::env::current_dir()
        .ok()
        .and_then(|dir| fs::canonicalize(dir).ok())
        .unwrap_or_default();
    info!(
        "{} {} starting on {} at {} (cwd {:?})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        host,
        Utc::now().to_rfc3339(),
        cwd
    );
}

/// Print aggregate statistics to stderr
fn print_summary(summary: &ChainSummary) {
    eprintln!("{}", "Summary".bold());
    for comparison in &summary.comparisons {
        eprintln!(
            "  {} -> {}: {} added, {} changed, {} missing",
            comparison.previous_root.display(),
            comparison.current_root.display(),
            comparison.stats.entries_added.to_string().green(),
            comparison.stats.entries_changed.to_string().yellow(),
            comparison.stats.entries_missing.to_string().red(),
        );
    }

    let total = &summary.total;
    eprintln!(
        "  {} roots, {} entries reported ({} added, {} changed, {} missing)",
        summary.roots_processed,
        total.total_operations(),
        difftree::format_bytes(total.bytes_added),
        difftree::format_bytes(total.bytes_changed),
        difftree::format_bytes(total.bytes_missing),
    );
    eprintln!("  finished in {:?}", summary.duration);
}
