//! Report sinks
//!
//! Every classification event (added, changed, missing) is handed to a
//! [`ReportSink`] the moment it is discovered. Sinks decide presentation;
//! the engine only guarantees that each event fires once per path per
//! comparison.
//!
//! - [`WriterSink`] streams text or JSON lines to any `Write` implementation
//! - [`MemorySink`] keeps events in memory, in emission order
//!
//! ```rust
//! use difftree::report::{MemorySink, ReportSink};
//! use difftree::types::{ChangeEvent, ChangeKind};
//! use std::path::PathBuf;
//!
//! # fn main() -> difftree::Result<()> {
//! let mut sink = MemorySink::new();
//! sink.report(&ChangeEvent::new(ChangeKind::Added, "/f3", PathBuf::from("/b"), 0))?;
//! assert_eq!(sink.paths(ChangeKind::Added), vec!["/f3"]);
//! # Ok(())
//! # }
//! ```

use crate::config::{OutputTarget, ReportFormat};
use crate::error::Result;
use crate::types::{ChangeEvent, ChangeKind};
use colored::Colorize;
use std::fs::File;
use std::io::{self, IsTerminal, LineWriter, Write};
use tracing::debug;

/// Destination for change events
pub trait ReportSink {
    /// Emit one event
    fn report(&mut self, event: &ChangeEvent) -> Result<()>;

    /// Flush buffered output
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Streams one line per event to a writer
pub struct WriterSink<W: Write> {
    writer: W,
    format: ReportFormat,
    color: bool,
}

impl<W: Write> WriterSink<W> {
    /// Create a sink writing `format` lines without color
    pub fn new(writer: W, format: ReportFormat) -> Self {
        Self {
            writer,
            format,
            color: false,
        }
    }

    /// Enable or disable colored classification tags (text format only)
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Consume the sink and return the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn format_text(&self, event: &ChangeEvent) -> String {
        let tag = format!("[{}]", event.kind);
        let tag = if self.color {
            match event.kind {
                ChangeKind::Added => tag.green().to_string(),
                ChangeKind::Changed => tag.yellow().to_string(),
                ChangeKind::Missing => tag.red().to_string(),
            }
        } else {
            tag
        };
        // Pad on the uncolored width so columns line up either way
        let padding = " ".repeat("[changed]".len() - format!("[{}]", event.kind).len());

        if event.differences.is_empty() {
            format!("{}{} {}", tag, padding, event.path)
        } else {
            let details: Vec<String> = event.differences.iter().map(|d| d.to_string()).collect();
            format!("{}{} {} ({})", tag, padding, event.path, details.join(", "))
        }
    }
}

impl WriterSink<Box<dyn Write>> {
    /// Open the sink described by a configuration's output settings
    ///
    /// Standard output is colored when it is a terminal; files are created or
    /// truncated and never colored.
    ///
    /// # Errors
    ///
    /// - [`DifftreeError::Io`](crate::DifftreeError::Io) if the output file
    ///   cannot be created
    pub fn open(target: &OutputTarget, format: ReportFormat) -> Result<Self> {
        match target {
            OutputTarget::Stdout => {
                let color = format == ReportFormat::Text && io::stdout().is_terminal();
                let writer: Box<dyn Write> = Box::new(io::stdout());
                Ok(WriterSink::new(writer, format).with_color(color))
            }
            OutputTarget::File(path) => {
                debug!("Writing reports to {:?}", path);
                let file = File::create(path)?;
                let writer: Box<dyn Write> = Box::new(LineWriter::new(file));
                Ok(WriterSink::new(writer, format))
            }
        }
    }
}

impl<W: Write> ReportSink for WriterSink<W> {
    fn report(&mut self, event: &ChangeEvent) -> Result<()> {
        match self.format {
            ReportFormat::Text => {
                let line = self.format_text(event);
                writeln!(self.writer, "{}", line)?;
            }
            ReportFormat::Json => {
                serde_json::to_writer(&mut self.writer, event)?;
                self.writer.write_all(b"\n")?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects events in memory, in emission order
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Vec<ChangeEvent>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far
    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    /// Paths of the events of one kind, in emission order
    pub fn paths(&self, kind: ChangeKind) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.path.as_str())
            .collect()
    }

    /// Consume the sink and return its events
    pub fn into_events(self) -> Vec<ChangeEvent> {
        self.events
    }
}

impl ReportSink for MemorySink {
    fn report(&mut self, event: &ChangeEvent) -> Result<()> {
        self.events.push(event.clone());
        Ok(())
    }
}
