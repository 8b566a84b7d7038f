//! Line-oriented output sinks for pipeline and live-session text.
//!
//! All user-visible text (tool output, stage progress, transcript
//! fragments) flows through the `Console` trait, so tests can capture it
//! and the binary can print it.

use std::sync::Mutex;

/// Destination for console lines.
///
/// Object-safe, Send + Sync so stage tasks can share one sink.
pub trait Console: Send + Sync {
    /// Emit one line of output.
    fn line(&self, text: &str);
}

/// Production console that prints to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutConsole;

impl StdoutConsole {
    pub fn new() -> Self {
        Self
    }
}

impl Console for StdoutConsole {
    fn line(&self, text: &str) {
        println!("{text}");
    }
}

/// Console that accumulates lines in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectorConsole {
    lines: Mutex<Vec<String>>,
}

impl CollectorConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all lines emitted so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// True if any emitted line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl Console for CollectorConsole {
    fn line(&self, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn collector_records_lines_in_order() {
        let console = CollectorConsole::new();
        console.line("first");
        console.line("second");
        assert_eq!(console.lines(), vec!["first", "second"]);
    }

    #[test]
    fn collector_contains_matches_substring() {
        let console = CollectorConsole::new();
        console.line("FFmpeg conversion successful.");
        assert!(console.contains("conversion successful"));
        assert!(!console.contains("failed"));
    }

    #[test]
    fn collector_is_shareable_across_threads() {
        let console = Arc::new(CollectorConsole::new());
        let c = console.clone();
        let handle = std::thread::spawn(move || c.line("from thread"));
        handle.join().unwrap();
        assert!(console.contains("from thread"));
    }

    #[test]
    fn stdout_console_constructs() {
        let console = StdoutConsole::new();
        // No assertion possible on stdout; just exercise the path.
        console.line("");
    }
}
