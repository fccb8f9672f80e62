//! Terminal rendering helpers

pub mod progress;

pub use progress::{ConsoleProgress, Progress, SilentProgress};
