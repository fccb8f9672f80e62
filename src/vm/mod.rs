//! Smalltalk VM invocation
//!
//! The VM is an opaque child process: it gets a working directory holding
//! `squeak.image` / `squeak.changes` plus a scripted payload, and leaves the
//! mutated image behind. In-VM standard streams land in `output.txt` and
//! `errors.txt` inside the working directory.

pub mod autodetect;

use crate::error::{SqueakerError, SqueakerResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// File consulted by in-image code to locate the user's project directory
pub const DIRECTORY_FILE: &str = "squeakerDirectory";
/// Name of the generated script payload
const SCRIPT_FILE: &str = "squeaker-stage.st";
/// Where the in-VM failure trap dumps backtraces
const ERRORS_FILE: &str = "errors.txt";

/// Abstract image transformer, so builds can run against a stand-in
#[async_trait]
pub trait ImageVm: Send + Sync {
    /// Apply a Smalltalk chunk to the image in `workdir`, mutating
    /// `squeak.image` / `squeak.changes` in place
    async fn apply(&self, workdir: &Path, chunk: &str) -> SqueakerResult<()>;

    /// Stable identity string fed into stage digests (the executable path)
    fn identity(&self) -> &str;
}

/// The real Squeak VM child process
pub struct SqueakVm {
    vm_path: PathBuf,
    vm_path_str: String,
    headless: bool,
    project_dir: PathBuf,
}

impl SqueakVm {
    pub fn new(vm_path: PathBuf, headless: bool, project_dir: PathBuf) -> Self {
        let vm_path_str = vm_path.to_string_lossy().into_owned();
        Self {
            vm_path,
            vm_path_str,
            headless,
            project_dir,
        }
    }

    /// The script wrapper: redirect in-image streams, run the chunk, then
    /// snapshot and quit. On any Smalltalk exception the trap writes a
    /// backtrace to errors.txt and snapshot-quits with exit code 1.
    fn script_for(chunk: &str) -> String {
        format!(
            r#"| out |
out := StandardFileStream forceNewFileNamed: 'output.txt'.
Smalltalk at: #Transcript put: out.
[{chunk}
.
out close.
Smalltalk snapshot: true andQuit: true]
    on: Error
    do: [:err | | log |
        log := StandardFileStream forceNewFileNamed: 'errors.txt'.
        log nextPutAll: err description; cr.
        err signalerContext errorReportOn: log.
        log close.
        out close.
        Smalltalk snapshot: true andQuit: false.
        Smalltalk exit: 1].
"#
        )
    }

    fn launch_args(&self, script: &Path) -> Vec<String> {
        let mut args = vec![];
        if self.headless {
            args.push("-headless".to_string());
        }
        args.push("squeak.image".to_string());
        args.push(script.to_string_lossy().into_owned());
        args
    }

    /// Run the VM on `squeak.image` with inherited stdio and extra `args`;
    /// returns the child's exit code
    pub async fn run_interactive(&self, workdir: &Path, args: &[String]) -> SqueakerResult<i32> {
        let mut cmd_args = vec![];
        if self.headless {
            cmd_args.push("-headless".to_string());
        }
        cmd_args.push("squeak.image".to_string());
        cmd_args.extend(args.iter().cloned());

        debug!("Running interactively: {} {:?}", self.vm_path_str, cmd_args);
        let status = Command::new(&self.vm_path)
            .args(&cmd_args)
            .current_dir(workdir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| SqueakerError::io(format!("spawning {}", self.vm_path_str), e))?;

        Ok(status.code().unwrap_or(-1))
    }
}

#[async_trait]
impl ImageVm for SqueakVm {
    async fn apply(&self, workdir: &Path, chunk: &str) -> SqueakerResult<()> {
        let dir_file = workdir.join(DIRECTORY_FILE);
        tokio::fs::write(&dir_file, self.project_dir.to_string_lossy().as_bytes())
            .await
            .map_err(|e| SqueakerError::io(format!("writing {}", dir_file.display()), e))?;

        let script = workdir.join(SCRIPT_FILE);
        tokio::fs::write(&script, Self::script_for(chunk))
            .await
            .map_err(|e| SqueakerError::io(format!("writing {}", script.display()), e))?;

        let args = self.launch_args(&script);
        info!("Applying chunk via {}", self.vm_path_str);
        debug!("Executing: {} {:?}", self.vm_path_str, args);

        let status = Command::new(&self.vm_path)
            .args(&args)
            .current_dir(workdir)
            .status()
            .await
            .map_err(|e| SqueakerError::io(format!("spawning {}", self.vm_path_str), e))?;

        if status.success() {
            return Ok(());
        }

        let log = tokio::fs::read_to_string(workdir.join(ERRORS_FILE))
            .await
            .unwrap_or_else(|_| "<no error log written>".to_string());
        Err(SqueakerError::VmFailure {
            code: status.code().unwrap_or(-1),
            log,
        })
    }

    fn identity(&self) -> &str {
        &self.vm_path_str
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_embeds_chunk_and_quits() {
        let script = SqueakVm::script_for("Installer installFile: 'x.st'");
        assert!(script.contains("Installer installFile: 'x.st'"));
        assert!(script.contains("snapshot: true andQuit: true"));
        assert!(script.contains("errors.txt"));
        assert!(script.contains("exit: 1"));
    }

    #[test]
    fn headless_flag_precedes_image() {
        let vm = SqueakVm::new(PathBuf::from("/usr/bin/squeak"), true, PathBuf::from("/p"));
        let args = vm.launch_args(Path::new("/work/s.st"));
        assert_eq!(args[0], "-headless");
        assert_eq!(args[1], "squeak.image");

        let vm = SqueakVm::new(PathBuf::from("/usr/bin/squeak"), false, PathBuf::from("/p"));
        let args = vm.launch_args(Path::new("/work/s.st"));
        assert_eq!(args[0], "squeak.image");
    }

    #[test]
    fn identity_is_the_vm_path() {
        let vm = SqueakVm::new(PathBuf::from("/opt/squeak/bin/squeak"), true, "/p".into());
        assert_eq!(vm.identity(), "/opt/squeak/bin/squeak");
    }
}
