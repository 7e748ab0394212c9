//! `dev6!` developer traces from the compilers and the delta engine.
//!
//! Every trace goes to the `nexusodm::dev6` log target. While a [`Capture`] is
//! alive on the current thread the lines are also buffered in memory, so tests
//! can inspect them without installing a global logger.

use std::cell::RefCell;

thread_local! {
    static CAPTURE: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Buffers this thread's `dev6!` lines until dropped.
#[must_use = "capture stops when the guard is dropped"]
pub struct Capture {
    _private: (),
}

impl Capture {
    pub fn start() -> Self {
        CAPTURE.with(|c| *c.borrow_mut() = Some(Vec::new()));
        Self { _private: () }
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        CAPTURE.with(|c| c.borrow().clone().unwrap_or_default())
    }

    /// Return and clear the buffered lines.
    pub fn take(&self) -> Vec<String> {
        CAPTURE.with(|c| c.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
    }

    /// Lines containing `needle`.
    #[must_use]
    pub fn count(&self, needle: &str) -> usize {
        CAPTURE.with(|c| {
            c.borrow().as_ref().map_or(0, |buf| buf.iter().filter(|l| l.contains(needle)).count())
        })
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        CAPTURE.with(|c| *c.borrow_mut() = None);
    }
}

/// Run `f` with a capture active and return its traces alongside the result.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    let guard = Capture::start();
    let out = f();
    (out, guard.take())
}

#[doc(hidden)]
pub fn record(line: String) {
    log::trace!(target: crate::logger::DEV6_TARGET, "{line}");
    CAPTURE.with(|c| {
        if let Some(buf) = c.borrow_mut().as_mut() {
            buf.push(line);
        }
    });
}

#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {
        $crate::devlog::record(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Field;

    #[test]
    fn compile_traces_are_captured() {
        let e = Field::new("age").gt(5) & Field::new("age").lt(10);
        let (doc, lines) = capture(|| e.compile());
        assert_eq!(doc.len(), 1);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"compile\":\"query\""), "{lines:?}");
    }

    #[test]
    fn nothing_is_buffered_without_a_capture() {
        crate::dev6!("dropped");
        let guard = Capture::start();
        assert!(guard.lines().is_empty());
        crate::dev6!("kept {}", 1);
        assert_eq!(guard.count("kept 1"), 1);
        assert_eq!(guard.take().len(), 1);
        assert!(guard.lines().is_empty());
    }

    #[test]
    fn captures_are_per_thread() {
        let guard = Capture::start();
        let child = std::thread::spawn(|| {
            crate::dev6!("child");
            CAPTURE.with(|c| c.borrow().is_none())
        });
        assert!(child.join().unwrap());
        assert_eq!(guard.count("child"), 0);
    }
}
