//! Console trace sink.
//!
//! Renders each [`TraceRecord`] into a reusable line buffer and writes it
//! to stdout in one call, so records from different channels never
//! interleave mid-line.  Output is flushed per record: the host-side
//! tooling reads the serial stream live.

use std::io::Write;

use log::warn;

use crate::app::ports::{TraceRecord, TraceSink};
use crate::capture::trace::write_record;

pub struct ConsoleTraceSink<W: Write> {
    out: W,
    line: String,
}

impl ConsoleTraceSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleTraceSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            line: String::with_capacity(256),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for ConsoleTraceSink<W> {
    fn emit(&mut self, record: &TraceRecord<'_>) {
        self.line.clear();
        if write_record(&mut self.line, record).is_err() {
            return;
        }
        if let Err(e) = self
            .out
            .write_all(self.line.as_bytes())
            .and_then(|()| self.out.flush())
        {
            warn!("Console: trace write failed: {}", e);
        }
    }
}
