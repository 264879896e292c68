//! JSON-lines tick log.

use ecosim_core::{TickSummary, WorldPersistence};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// Writes every [`TickSummary`] as one JSON object per line.
///
/// The first write failure is logged and later ticks are dropped, so a full disk never stops a
/// running world.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    failed: bool,
}

impl JsonLinesSink<BufWriter<File>> {
    /// Create (or truncate) `path` and log into it.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failed: false,
        }
    }

    #[must_use]
    pub const fn has_failed(&self) -> bool {
        self.failed
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, summary: &TickSummary) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, summary)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write + Send> WorldPersistence for JsonLinesSink<W> {
    fn on_tick(&mut self, summary: &TickSummary) {
        if self.failed {
            return;
        }
        if let Err(error) = self.write_line(summary) {
            warn!(tick = %summary.tick, %error, "stats sink failed; dropping further ticks");
            self.failed = true;
        }
    }
}
