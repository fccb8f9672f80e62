//! Integration tests for Squeaker

mod cli_tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn squeaker() -> Command {
        Command::cargo_bin("squeaker").unwrap()
    }

    /// A command pointed at an isolated, empty cache
    fn squeaker_in(cache: &TempDir) -> Command {
        let mut cmd = squeaker();
        cmd.arg("--cache-root").arg(cache.path());
        cmd
    }

    #[test]
    fn help_displays() {
        squeaker()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Smalltalk images"));
    }

    #[test]
    fn version_displays() {
        squeaker()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("squeaker"));
    }

    #[test]
    fn tags_empty_cache() {
        let cache = TempDir::new().unwrap();
        squeaker_in(&cache)
            .arg("tags")
            .assert()
            .success()
            .stdout(predicate::str::contains("No tags"));
    }

    #[test]
    fn resolve_missing_tag_fails() {
        let cache = TempDir::new().unwrap();
        squeaker_in(&cache)
            .args(["resolve-tag", "nonexistent"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Tag not found"));
    }

    #[test]
    fn untag_missing_is_idempotent() {
        let cache = TempDir::new().unwrap();
        squeaker_in(&cache)
            .args(["untag", "nonexistent"])
            .assert()
            .success();
    }

    #[test]
    fn unstage_unknown_prefix_fails() {
        let cache = TempDir::new().unwrap();
        squeaker_in(&cache)
            .args(["unstage", "deadbeef"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("deadbeef"));
    }

    #[test]
    fn gc_empty_cache() {
        let cache = TempDir::new().unwrap();
        squeaker_in(&cache)
            .arg("gc")
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to remove"));
    }

    #[test]
    fn gc_flags_conflict() {
        let cache = TempDir::new().unwrap();
        squeaker_in(&cache)
            .args(["gc", "--delete-all-urls", "--delete-unreferenced-urls"])
            .assert()
            .failure();
    }

    #[test]
    fn dot_empty_cache() {
        let cache = TempDir::new().unwrap();
        squeaker_in(&cache)
            .arg("dot")
            .assert()
            .success()
            .stdout(predicate::str::contains("digraph stages"));
    }

    #[test]
    fn build_missing_recipe_fails() {
        let cache = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        squeaker_in(&cache)
            .args(["build", "--vm", "/bin/true"])
            .arg(project.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Squeakerfile.st"));
    }

    #[test]
    fn run_unknown_reference_fails() {
        let cache = TempDir::new().unwrap();
        squeaker_in(&cache)
            .args(["run", "--vm", "/bin/true", "no-such-image"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no-such-image"));
    }

    #[test]
    fn create_unknown_reference_fails() {
        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        squeaker_in(&cache)
            .args(["create", "no-such-image"])
            .arg(dest.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("no-such-image"));
    }

    #[test]
    fn print_autodetect_runs() {
        squeaker()
            .arg("print-autodetect")
            .assert()
            .success()
            .stdout(predicate::str::contains("squeak"));
    }
}
