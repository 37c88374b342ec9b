//! Logger and writer sinks used by the sampler to report diagnostics.
//!
//! The sampler never prints directly. Numerical issues that do not interrupt
//! sampling (rejected proposals, undefined densities) go to a [`Logger`], while
//! the sampler state (step size, metric) is written record by record to a
//! [`Writer`].

use std::io::Write;

use log::Level;

/// Sink for informational and error-level messages.
pub trait Logger {
    fn info(&mut self, message: &str);
    fn error(&mut self, message: &str);
}

/// Forwards every message to the `log` facade.
#[derive(Debug, Clone, Default)]
pub struct LogLogger {
    chain_id: Option<usize>,
}

impl LogLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags every forwarded message with the id of the chain that produced it.
    pub fn for_chain(chain_id: usize) -> Self {
        Self {
            chain_id: Some(chain_id),
        }
    }

    fn forward(&self, level: Level, message: &str) {
        match self.chain_id {
            Some(id) => log::log!(level, "chain {id}: {message}"),
            None => log::log!(level, "{message}"),
        }
    }
}

impl Logger for LogLogger {
    fn info(&mut self, message: &str) {
        self.forward(Level::Info, message);
    }

    fn error(&mut self, message: &str) {
        self.forward(Level::Error, message);
    }
}

/// Keeps every message in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferLogger {
    pub records: Vec<(Level, String)>,
}

impl BufferLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages logged at exactly `level`.
    pub fn messages(&self, level: Level) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .filter(move |(l, _)| *l == level)
            .map(|(_, m)| m.as_str())
    }
}

impl Logger for BufferLogger {
    fn info(&mut self, message: &str) {
        self.records.push((Level::Info, message.to_string()));
    }

    fn error(&mut self, message: &str) {
        self.records.push((Level::Error, message.to_string()));
    }
}

/// Line-oriented sink for human-readable sampler state. One record per call.
pub trait Writer {
    fn write_message(&mut self, message: &str);
    fn write_values(&mut self, values: &[f64]);
}

fn join_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Writes records as lines to any [`std::io::Write`] implementor.
///
/// Messages are prefixed with `prefix` (e.g. `"# "` for comment lines in a CSV
/// file). Write failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    out: W,
    prefix: String,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            prefix: String::new(),
        }
    }

    pub fn with_prefix(out: W, prefix: impl Into<String>) -> Self {
        Self {
            out,
            prefix: prefix.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}") {
            log::warn!("diagnostic writer failed: {e}");
        }
    }
}

impl<W: Write> Writer for StreamWriter<W> {
    fn write_message(&mut self, message: &str) {
        let line = format!("{}{}", self.prefix, message);
        self.line(&line);
    }

    fn write_values(&mut self, values: &[f64]) {
        let line = join_values(values);
        self.line(&line);
    }
}

/// Collects records as strings.
#[derive(Debug, Clone, Default)]
pub struct BufferWriter {
    pub lines: Vec<String>,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Writer for BufferWriter {
    fn write_message(&mut self, message: &str) {
        self.lines.push(message.to_string());
    }

    fn write_values(&mut self, values: &[f64]) {
        self.lines.push(join_values(values));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_logger_filters_by_level() {
        let mut logger = BufferLogger::new();
        logger.info("first");
        logger.error("second");
        logger.info("third");

        let infos: Vec<&str> = logger.messages(Level::Info).collect();
        assert_eq!(infos, vec!["first", "third"]);
        assert_eq!(logger.messages(Level::Error).count(), 1);
        assert_eq!(logger.messages(Level::Debug).count(), 0);
    }

    #[test]
    fn test_stream_writer_prefixes_messages_only() {
        let mut writer = StreamWriter::with_prefix(Vec::new(), "# ");
        writer.write_message("Step size = 0.5");
        writer.write_values(&[1.0, 2.5]);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, "# Step size = 0.5\n1, 2.5\n");
    }

    #[test]
    fn test_buffer_writer_one_line_per_record() {
        let mut writer = BufferWriter::new();
        writer.write_message("hello");
        writer.write_values(&[0.25]);
        assert_eq!(writer.lines, vec!["hello".to_string(), "0.25".to_string()]);
    }
}
