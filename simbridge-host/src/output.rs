//! The user-facing console log.

use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

/// Receives script output and run results for display.
pub trait ConsoleOutput {
    fn log(&mut self, text: &str);
}

/// Forwards console lines to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingOutput;

impl ConsoleOutput for TracingOutput {
    fn log(&mut self, text: &str) {
        info!(target: "simbridge::console", "{}", text.trim_end());
    }
}

/// Keeps console lines in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct BufferedOutput {
    lines: Rc<RefCell<Vec<String>>>,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|line| line.contains(needle))
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl ConsoleOutput for BufferedOutput {
    fn log(&mut self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }
}
