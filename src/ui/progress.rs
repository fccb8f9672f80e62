//! Progress reporting with non-TTY fallback
//!
//! The engine reports raw counts; rendering is decided here. Interactive
//! terminals get inline carriage-return updates, everything else stays
//! silent so logs don't fill with partial lines.

use console::user_attended_stderr;
use std::io::Write;

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Sink for engine progress updates
pub trait Progress: Send + Sync {
    /// Report `done` units out of an optionally-known `expected` total
    fn update(&self, done: u64, expected: Option<u64>, label: &str);

    /// Erase any partial output line
    fn clear(&self);
}

/// Inline carriage-return progress on stderr
pub struct ConsoleProgress {
    interactive: bool,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            interactive: user_attended_stderr(),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for ConsoleProgress {
    fn update(&self, done: u64, expected: Option<u64>, label: &str) {
        if !self.interactive {
            return;
        }
        match expected {
            Some(total) => eprint!(
                "\r{}: {} / {}   ",
                label,
                format_bytes(done),
                format_bytes(total)
            ),
            None => eprint!("\r{}: {}   ", label, format_bytes(done)),
        }
        let _ = std::io::stderr().flush();
    }

    fn clear(&self) {
        if self.interactive {
            eprint!("\r\x1b[K");
            let _ = std::io::stderr().flush();
        }
    }
}

/// Discards all updates; used by non-interactive callers and tests
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn update(&self, _done: u64, _expected: Option<u64>, _label: &str) {}
    fn clear(&self) {}
}
