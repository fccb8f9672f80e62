//! Content-addressed on-disk cache
//!
//! Three namespaces under the cache root: `images/` holds opaque blobs named
//! by their own SHA-512, `stages/` holds JSON stage records named by stage
//! digest, `tags/` holds JSON pointers named by tag. Writes are
//! file-granular; a record whose blob went missing is repaired by the
//! resolver, so partial writes never poison the cache.

pub mod digest;
pub mod stage;

pub use stage::{StageBody, StageRecord, StageType, Tag};

use crate::error::{SqueakerError, SqueakerResult};
use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::debug;

/// The three cache namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Images,
    Stages,
    Tags,
}

impl Namespace {
    pub fn dir(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Stages => "stages",
            Self::Tags => "tags",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

/// Content-addressed store rooted at the user cache directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Default cache root: `<XDG_CACHE_HOME>/squeaker`, falling back to
    /// `<HOME>/.cache/squeaker`
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("squeaker")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, ns: Namespace, id: &str) -> PathBuf {
        self.root.join(ns.dir()).join(id)
    }

    async fn ensure_dir(&self, dir: &Path) -> SqueakerResult<()> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| SqueakerError::io(format!("creating directory {}", dir.display()), e))
    }

    // --- blobs ---

    /// A staging file inside the cache root, so promotion is a same-device
    /// rename
    pub fn staging_file(&self) -> SqueakerResult<NamedTempFile> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| SqueakerError::io(format!("creating {}", self.root.display()), e))?;
        NamedTempFile::new_in(&self.root)
            .map_err(|e| SqueakerError::io("creating staging file", e))
    }

    /// Hash a staged file and move it into `images/` under its content
    /// digest. Overwriting an existing destination is fine: the content is
    /// identical by construction.
    pub async fn promote_blob(&self, staged: NamedTempFile) -> SqueakerResult<String> {
        let hash = digest::digest_file(staged.path())?;
        self.ensure_dir(&self.root.join(Namespace::Images.dir())).await?;

        let dest = self.entry_path(Namespace::Images, &hash);
        staged
            .persist(&dest)
            .map_err(|e| SqueakerError::io(format!("promoting blob to {}", dest.display()), e.error))?;

        debug!(digest = %&hash[..12], "blob stored");
        Ok(hash)
    }

    /// Store a byte slice as an image blob
    pub async fn put_blob_bytes(&self, bytes: &[u8]) -> SqueakerResult<String> {
        use std::io::Write;
        let mut staged = self.staging_file()?;
        staged
            .write_all(bytes)
            .map_err(|e| SqueakerError::io("writing staged blob", e))?;
        self.promote_blob(staged).await
    }

    pub fn has_blob(&self, image_digest: &str) -> bool {
        self.entry_path(Namespace::Images, image_digest).exists()
    }

    pub fn blob_path(&self, image_digest: &str) -> PathBuf {
        self.entry_path(Namespace::Images, image_digest)
    }

    // --- stage records ---

    pub async fn load_stage_opt(&self, stage_digest: &str) -> SqueakerResult<Option<StageRecord>> {
        let path = self.entry_path(Namespace::Stages, stage_digest);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| SqueakerError::io(format!("reading stage record {}", path.display()), e))?;
        let record: StageRecord = serde_json::from_str(&content).map_err(|e| {
            SqueakerError::Internal(format!("unreadable stage record {}: {}", stage_digest, e))
        })?;
        Ok(Some(record))
    }

    pub async fn load_stage(&self, stage_digest: &str) -> SqueakerResult<StageRecord> {
        self.load_stage_opt(stage_digest)
            .await?
            .ok_or_else(|| SqueakerError::CacheMiss(stage_digest.to_string()))
    }

    pub async fn write_stage(&self, record: &StageRecord) -> SqueakerResult<()> {
        let path = self.entry_path(Namespace::Stages, &record.stage_digest);
        self.ensure_dir(&self.root.join(Namespace::Stages.dir())).await?;

        let content = serde_json::to_string_pretty(record)?;
        fs::write(&path, content)
            .await
            .map_err(|e| SqueakerError::io(format!("writing stage record {}", path.display()), e))
    }

    // --- tags ---

    pub async fn load_tag_opt(&self, name: &str) -> SqueakerResult<Option<Tag>> {
        let path = self.entry_path(Namespace::Tags, name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| SqueakerError::io(format!("reading tag {}", path.display()), e))?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub async fn load_tag(&self, name: &str) -> SqueakerResult<Tag> {
        self.load_tag_opt(name)
            .await?
            .ok_or_else(|| SqueakerError::TagNotFound(name.to_string()))
    }

    /// Write (or overwrite) a tag pointer
    pub async fn write_tag(&self, tag: &Tag) -> SqueakerResult<()> {
        let path = self.entry_path(Namespace::Tags, &tag.tag);
        self.ensure_dir(&self.root.join(Namespace::Tags.dir())).await?;

        let content = serde_json::to_string_pretty(tag)?;
        fs::write(&path, content)
            .await
            .map_err(|e| SqueakerError::io(format!("writing tag {}", path.display()), e))
    }

    // --- namespace-generic operations ---

    /// Enumerate entry names in a namespace, sorted
    pub async fn list(&self, ns: Namespace) -> SqueakerResult<Vec<String>> {
        let dir = self.root.join(ns.dir());
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut names = vec![];
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| SqueakerError::io(format!("listing {}", dir.display()), e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SqueakerError::io(format!("listing {}", dir.display()), e))?
        {
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Idempotent delete: a missing entry succeeds silently
    pub async fn delete(&self, ns: Namespace, id: &str) -> SqueakerResult<()> {
        let path = self.entry_path(ns, id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SqueakerError::io(format!("deleting {}", path.display()), e)),
        }
    }

    /// Resolve a user-facing short prefix to a full entry name.
    ///
    /// Zero matches resolve to `None`; more than one is an error.
    pub async fn resolve_prefix(
        &self,
        ns: Namespace,
        prefix: &str,
    ) -> SqueakerResult<Option<String>> {
        let mut matches: Vec<String> = self
            .list(ns)
            .await?
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(SqueakerError::AmbiguousPrefix {
                prefix: prefix.to_string(),
            }),
        }
    }

    // --- recent changes audit trail ---

    /// Copy a changes file into `recentchanges/`, keeping only the newest
    /// `keep` entries
    pub async fn record_recent_changes(
        &self,
        changes_file: &Path,
        keep: usize,
    ) -> SqueakerResult<PathBuf> {
        let dir = self.root.join("recentchanges");
        self.ensure_dir(&dir).await?;

        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let dest = dir.join(format!("{}.changes", stamp));
        fs::copy(changes_file, &dest)
            .await
            .map_err(|e| SqueakerError::io(format!("copying changes to {}", dest.display()), e))?;

        // Names sort chronologically, so pruning is a sort and a split.
        let mut names: Vec<String> = vec![];
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| SqueakerError::io("listing recentchanges", e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SqueakerError::io("listing recentchanges", e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        let excess = names.len().saturating_sub(keep);
        for old in names.into_iter().take(excess) {
            let _ = fs::remove_file(dir.join(old)).await;
        }

        Ok(dest)
    }
}
