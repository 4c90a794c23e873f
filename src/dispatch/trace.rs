//! Dispatch tracing.
//!
//! When enabled, every dispatched event appends one block to the sink:
//!
//! ```text
//! rule: 'column_name'
//!   string: 'bar'
//!   YIELDING TO RULE          (only when an action is registered)
//! ```
//!
//! A disabled trace never touches its sink, not even to flush it.

use crate::error::DispatchError;
use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

/// Where trace blocks go.
#[derive(Default)]
pub enum TraceSink {
    #[default]
    Stdout,
    Stderr,
    /// In-memory buffer; clones of the [`Capture`] see the same bytes.
    Capture(Capture),
    Writer(Box<dyn Write>),
}

impl TraceSink {
    fn write_block(&mut self, block: &[u8]) -> io::Result<()> {
        match self {
            TraceSink::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(block)?;
                out.flush()
            }
            TraceSink::Stderr => {
                let mut out = io::stderr().lock();
                out.write_all(block)?;
                out.flush()
            }
            TraceSink::Capture(capture) => capture.write_all(block),
            TraceSink::Writer(writer) => {
                writer.write_all(block)?;
                writer.flush()
            }
        }
    }
}

impl fmt::Debug for TraceSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceSink::Stdout => f.write_str("Stdout"),
            TraceSink::Stderr => f.write_str("Stderr"),
            TraceSink::Capture(capture) => f.debug_tuple("Capture").field(&capture.contents().len()).finish(),
            TraceSink::Writer(_) => f.write_str("Writer(<dyn Write>)"),
        }
    }
}

/// Shared in-memory trace buffer.
#[derive(Debug, Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Whether `self` and `other` write into the same buffer.
    pub fn same_buffer(&self, other: &Capture) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Tracing flag plus sink, owned by one dispatcher.
#[derive(Debug, Default)]
pub struct TraceState {
    enabled: bool,
    sink: TraceSink,
}

impl TraceState {
    /// Disabled trace writing to `sink` once enabled.
    pub fn new(sink: TraceSink) -> Self {
        TraceState { enabled: false, sink }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn sink(&self) -> &TraceSink {
        &self.sink
    }

    /// Swap in a new sink, returning the old one.
    pub fn set_sink(&mut self, sink: TraceSink) -> TraceSink {
        std::mem::replace(&mut self.sink, sink)
    }

    /// Append the block for one dispatch event, if enabled.
    pub fn record(&mut self, rule: &str, text: &str, yielded: bool) -> Result<(), DispatchError> {
        if !self.enabled {
            return Ok(());
        }
        self.sink.write_block(format_block(rule, text, yielded).as_bytes()).map_err(DispatchError::Trace)
    }
}

fn format_block(rule: &str, text: &str, yielded: bool) -> String {
    let mut block = format!("rule: '{rule}'\n  string: '{text}'\n");
    if yielded {
        block.push_str("  YIELDING TO RULE\n");
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn formats_plain_and_yielding_blocks() {
        assert_eq!(format_block("foo", "something", false), "rule: 'foo'\n  string: 'something'\n");
        assert_eq!(format_block("foo", "bar", true), "rule: 'foo'\n  string: 'bar'\n  YIELDING TO RULE\n");
    }

    #[test]
    fn defaults_to_disabled_stdout() {
        let state = TraceState::default();
        assert!(!state.is_enabled());
        assert!(matches!(state.sink(), TraceSink::Stdout));
    }

    #[test]
    fn disabled_trace_leaves_sink_untouched() {
        let capture = Capture::new();
        let mut state = TraceState::new(TraceSink::Capture(capture.clone()));

        state.record("foo", "bar", true).unwrap();
        assert!(capture.is_empty());

        state.set_enabled(true);
        state.record("foo", "bar", true).unwrap();
        state.record("baz", "", false).unwrap();
        assert_eq!(
            capture.contents(),
            "rule: 'foo'\n  string: 'bar'\n  YIELDING TO RULE\nrule: 'baz'\n  string: ''\n"
        );
    }

    #[test]
    fn set_sink_hands_back_the_previous_one() {
        let capture = Capture::new();
        let mut state = TraceState::new(TraceSink::Capture(capture.clone()));

        let previous = state.set_sink(TraceSink::Stderr);
        assert!(matches!(previous, TraceSink::Capture(c) if c.same_buffer(&capture)));
        assert!(matches!(state.sink(), TraceSink::Stderr));
    }

    #[test]
    fn write_failures_surface_as_trace_errors() {
        let mut state = TraceState::new(TraceSink::Writer(Box::new(Broken)));
        state.set_enabled(true);

        let err = state.record("foo", "bar", false).unwrap_err();
        assert!(matches!(err, DispatchError::Trace(e) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn capture_clear_and_debug() {
        let mut capture = Capture::new();
        capture.write_all(b"abc").unwrap();
        assert_eq!(format!("{:?}", TraceSink::Capture(capture.clone())), "Capture(3)");

        capture.clear();
        assert!(capture.is_empty());
    }
}
