//! Build console the step writes its progress to

use std::io::Write;
use std::sync::Mutex;

/// Line-oriented sink for user-facing step output.
///
/// Separate from `tracing`: this is what ends up in the build log.
pub trait Console: Send + Sync {
    fn println(&self, line: &str);

    fn blank(&self) {
        self.println("");
    }
}

/// Writes to the process stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn println(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
    }
}

/// Keeps every line in memory
#[derive(Debug, Default)]
pub struct BufferConsole {
    lines: Mutex<Vec<String>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn contents(&self) -> String {
        self.lines().join("\n")
    }

    /// Number of lines equal to `line`
    pub fn count(&self, line: &str) -> usize {
        self.lines().iter().filter(|l| l.as_str() == line).count()
    }
}

impl Console for BufferConsole {
    fn println(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_console_records_lines() {
        let console = BufferConsole::new();
        console.println("one");
        console.blank();
        console.println("one");
        assert_eq!(console.lines(), vec!["one", "", "one"]);
        assert_eq!(console.count("one"), 2);
        assert_eq!(console.contents(), "one\n\none");
    }
}
