//! Shared test fixtures
//!
//! A deterministic VM stand-in and a temp-dir cache, so engine tests can run
//! full builds without a Smalltalk VM installed.

use crate::error::SqueakerResult;
use crate::resolver::StageResolver;
use crate::store::{CacheStore, StageType};
use crate::ui::SilentProgress;
use crate::vm::ImageVm;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;

/// Deterministic VM stand-in: "applying a chunk" appends the chunk text to
/// the image bytes and notes it in the changes file. Same input image +
/// same chunk always produces the same output image.
pub(crate) struct ScriptedVm {
    identity: String,
}

impl ScriptedVm {
    pub(crate) fn new() -> Self {
        Self::with_identity("/test/vm")
    }

    pub(crate) fn with_identity(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
        }
    }
}

#[async_trait]
impl ImageVm for ScriptedVm {
    async fn apply(&self, workdir: &Path, chunk: &str) -> SqueakerResult<()> {
        let image = workdir.join("squeak.image");
        let mut bytes = std::fs::read(&image).unwrap();
        bytes.extend_from_slice(chunk.as_bytes());
        std::fs::write(&image, bytes).unwrap();

        let changes = workdir.join("squeak.changes");
        let mut log = std::fs::read(&changes).unwrap();
        log.extend_from_slice(b"\n");
        log.extend_from_slice(chunk.as_bytes());
        std::fs::write(&changes, log).unwrap();
        Ok(())
    }

    fn identity(&self) -> &str {
        &self.identity
    }
}

/// Temp-dir cache plus project dir plus scripted VM
pub(crate) struct Fixture {
    pub dir: TempDir,
    pub store: CacheStore,
    pub vm: ScriptedVm,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("cache"));
        Self {
            dir,
            store,
            vm: ScriptedVm::new(),
        }
    }

    pub(crate) fn resolver(&self) -> StageResolver<'_> {
        StageResolver::new(
            &self.store,
            &self.vm,
            &SilentProgress,
            self.dir.path().to_path_buf(),
            HashSet::new(),
        )
    }

    pub(crate) fn resolver_no_cache(&self, types: &[StageType]) -> StageResolver<'_> {
        StageResolver::new(
            &self.store,
            &self.vm,
            &SilentProgress,
            self.dir.path().to_path_buf(),
            types.iter().copied().collect(),
        )
    }

    /// A base image blob reachable through a file: URL
    pub(crate) fn base_url(&self) -> String {
        self.named_base_url("base.zip")
    }

    /// A distinct base blob under a caller-chosen name
    pub(crate) fn named_base_url(&self, name: &str) -> String {
        let zip_path = self.dir.path().join(name);
        if !zip_path.exists() {
            let file = std::fs::File::create(&zip_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            use std::io::Write;
            writer.start_file("a.image", options).unwrap();
            writer.write_all(name.as_bytes()).unwrap();
            writer.start_file("a.changes", options).unwrap();
            writer.write_all(b"CHG").unwrap();
            writer.finish().unwrap();
        }
        format!("file://{}", zip_path.display())
    }
}
