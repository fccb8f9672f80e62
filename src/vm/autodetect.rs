//! VM executable discovery
//!
//! Probes a fixed list of conventional install locations plus PATH. The
//! first existing candidate wins; `print-autodetect` shows the whole probe.

use std::env;
use std::path::PathBuf;

/// Locations worth probing for a Squeak VM, in preference order
pub fn candidates() -> Vec<PathBuf> {
    let mut paths = vec![];

    // PATH entries first: an explicitly-installed VM beats system defaults.
    if let Some(path_var) = env::var_os("PATH") {
        for dir in env::split_paths(&path_var) {
            paths.push(dir.join("squeak"));
        }
    }

    paths.extend(
        [
            "/usr/bin/squeak",
            "/usr/local/bin/squeak",
            "/opt/squeak/bin/squeak",
        ]
        .iter()
        .map(PathBuf::from),
    );

    if cfg!(target_os = "macos") {
        paths.push(PathBuf::from("/Applications/Squeak.app/Contents/MacOS/Squeak"));
    }

    paths
}

/// First candidate that exists on this machine
pub fn autodetect() -> Option<PathBuf> {
    candidates().into_iter().find(|p| p.is_file())
}

/// Multi-line report of every probed location, for `print-autodetect` and
/// the VmNotFound error
pub fn probe_report() -> String {
    candidates()
        .iter()
        .map(|p| {
            let marker = if p.is_file() { "found" } else { "absent" };
            format!("  {} [{}]", p.display(), marker)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_include_system_locations() {
        let c = candidates();
        assert!(c.iter().any(|p| p == &PathBuf::from("/usr/bin/squeak")));
        assert!(c.iter().any(|p| p == &PathBuf::from("/usr/local/bin/squeak")));
    }

    #[test]
    fn probe_report_lists_every_candidate() {
        let report = probe_report();
        assert!(report.contains("/usr/bin/squeak"));
        assert!(report.contains("[") && report.contains("]"));
    }
}
