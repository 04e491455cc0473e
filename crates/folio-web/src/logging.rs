#![forbid(unsafe_code)]

//! Log capture for hosts without stdout.
//!
//! [`LogCapture`] is a `tracing-subscriber` layer that formats each event as
//! one line and appends it to a bounded [`LogBuffer`]. The host drains the
//! buffer with `take_logs()` after each step. When the buffer is full the
//! oldest line is dropped and counted.

use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub const DEFAULT_LOG_CAPACITY: usize = 512;

#[derive(Debug, Default)]
struct Lines {
    lines: VecDeque<String>,
    dropped: u64,
}

/// Shared, bounded line buffer. Clones share storage.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    inner: Arc<Mutex<Lines>>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl LogBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Lines::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, line: String) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.lines.len() == self.capacity {
            guard.lines.pop_front();
            guard.dropped += 1;
        }
        guard.lines.push_back(line);
    }

    /// Take every buffered line, oldest first.
    pub fn drain(&self) -> Vec<String> {
        match self.inner.lock() {
            Ok(mut guard) => guard.lines.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().lines.drain(..).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map_or(0, |guard| guard.lines.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lines evicted because the buffer was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.inner.lock().map_or(0, |guard| guard.dropped)
    }
}

/// Layer writing `LEVEL target: message key=value ...` lines to a buffer.
#[derive(Debug, Clone)]
pub struct LogCapture {
    buffer: LogBuffer,
    max_level: Level,
}

impl LogCapture {
    #[must_use]
    pub fn new(buffer: LogBuffer, max_level: Level) -> Self {
        Self { buffer, max_level }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn enabled(&self, metadata: &tracing::Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        *metadata.level() <= self.max_level
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let mut line = format!("{} {}: {}", metadata.level(), metadata.target(), visitor.message);
        line.push_str(&visitor.fields);
        self.buffer.push(line);
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Parse a level name (`"trace"`, `"DEBUG"`, ...). Unknown names yield `None`.
#[must_use]
pub fn parse_level(name: &str) -> Option<Level> {
    name.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(max_level: Level, f: impl FnOnce()) -> Vec<String> {
        let buffer = LogBuffer::new(16);
        let subscriber = tracing_subscriber::registry().with(LogCapture::new(buffer.clone(), max_level));
        tracing::subscriber::with_default(subscriber, f);
        buffer.drain()
    }

    #[test]
    fn formats_message_and_fields() {
        let lines = capture(Level::DEBUG, || {
            tracing::warn!(target: "folio", key = "counter-0", count = 3, "layout for unknown surface");
        });
        assert_eq!(
            lines,
            vec!["WARN folio: layout for unknown surface key=counter-0 count=3".to_owned()]
        );
    }

    #[test]
    fn level_filter_applies() {
        let lines = capture(Level::INFO, || {
            tracing::debug!("hidden");
            tracing::trace!("hidden");
            tracing::info!("shown");
        });
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("shown"));
    }

    #[test]
    fn full_buffer_drops_oldest() {
        let buffer = LogBuffer::new(2);
        for i in 0..5 {
            buffer.push(format!("line {i}"));
        }
        assert_eq!(buffer.dropped(), 3);
        assert_eq!(buffer.drain(), vec!["line 3".to_owned(), "line 4".to_owned()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn parses_level_names() {
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level(" WARN "), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }
}
