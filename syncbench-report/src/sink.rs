//! Output Sinks
//!
//! Report lines are streamed: each line is handed to the sink as soon as its
//! case finishes, and stream-backed sinks flush immediately.

use std::io::{self, Write};

/// Destination for report lines
pub trait ReportSink {
    /// Emit one complete report line (without trailing newline)
    fn emit(&mut self, line: &str) -> io::Result<()>;
}

/// Writes each line to standard output and flushes it
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()
    }
}

/// Writes each line to an arbitrary writer and flushes it
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the wrapped writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for WriterSink<W> {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.writer, "{line}")?;
        self.writer.flush()
    }
}

/// Collects lines in memory
impl ReportSink for Vec<String> {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        self.push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_collects_in_order() {
        let mut sink: Vec<String> = Vec::new();
        sink.emit("first").unwrap();
        sink.emit("second").unwrap();
        assert_eq!(sink, vec!["first", "second"]);
    }

    #[test]
    fn test_writer_sink_terminates_lines() {
        let mut sink = WriterSink::new(Vec::new());
        sink.emit("a").unwrap();
        sink.emit("b").unwrap();
        assert_eq!(sink.into_inner(), b"a\nb\n");
    }
}
