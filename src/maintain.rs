//! Cache maintenance
//!
//! Mark-and-sweep over the stage graph. Roots are the tags; URL stages get
//! extra protection so downloads survive even when nothing currently
//! depends on them. Stage records are cheap and always kept when reachable;
//! the `keep_intermediate` knob only controls which image blobs survive.

use crate::error::{SqueakerError, SqueakerResult};
use crate::store::{CacheStore, Namespace, StageRecord, StageType, Tag};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// What to do with image blobs of URL stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlPolicy {
    /// Protect every downloaded blob, referenced or not
    #[default]
    Keep,
    /// Keep blobs only for URL stages some tag still reaches
    DeleteUnreferenced,
    /// Drop every downloaded blob
    DeleteAll,
}

#[derive(Debug, Clone, Default)]
pub struct GcOptions {
    /// Walk depth up to which intermediate image blobs are kept.
    /// `None` keeps all of them; `Some(0)` keeps only the tips.
    pub keep_intermediate: Option<u64>,
    pub url_policy: UrlPolicy,
    pub dry_run: bool,
}

#[derive(Debug, Default)]
pub struct GcPlan {
    pub doomed_images: Vec<String>,
    pub doomed_stages: Vec<String>,
    pub marked_images: usize,
    pub marked_stages: usize,
}

impl GcPlan {
    pub fn is_empty(&self) -> bool {
        self.doomed_images.is_empty() && self.doomed_stages.is_empty()
    }
}

/// Walk a stage chain towards its roots, marking stages always and images
/// while the depth allows. Revisiting a marked stage still continues the
/// walk: a shallower visit may mark images a deeper one skipped.
fn walk_chain(
    records: &HashMap<String, StageRecord>,
    start: &str,
    keep_intermediate: Option<u64>,
    marked_stages: &mut HashSet<String>,
    marked_images: &mut HashSet<String>,
) {
    let mut depth: u64 = 0;
    let mut cursor = Some(start.to_string());
    while let Some(digest) = cursor {
        let Some(record) = records.get(&digest) else {
            warn!("stage {} is dangling, stopping walk", &digest[..12.min(digest.len())]);
            break;
        };
        marked_stages.insert(digest);
        if keep_intermediate.map_or(true, |limit| depth <= limit) {
            marked_images.insert(record.image_digest.clone());
        }
        cursor = record.parent().map(str::to_string);
        depth += 1;
    }
}

/// Compute which entries GC would remove, and remove them unless `dry_run`
pub async fn gc(store: &CacheStore, options: &GcOptions) -> SqueakerResult<GcPlan> {
    // Every readable stage record, by digest. Unreadable ones stay out of
    // the map: unmarked, and therefore swept.
    let mut records: HashMap<String, StageRecord> = HashMap::new();
    let on_disk_stages = store.list(Namespace::Stages).await?;
    for digest in &on_disk_stages {
        match store.load_stage_opt(digest).await {
            Ok(Some(record)) => {
                records.insert(digest.clone(), record);
            }
            Ok(None) => {}
            Err(e) => warn!("sweeping unreadable stage record {}: {}", digest, e),
        }
    }

    let mut marked_stages = HashSet::new();
    let mut marked_images = HashSet::new();

    // Tag roots: the tip image is always kept.
    for name in store.list(Namespace::Tags).await? {
        match store.load_tag_opt(&name).await {
            Ok(Some(tag)) => {
                marked_images.insert(tag.image_digest.clone());
                walk_chain(
                    &records,
                    &tag.stage_digest,
                    options.keep_intermediate,
                    &mut marked_stages,
                    &mut marked_images,
                );
            }
            Ok(None) => {}
            Err(e) => warn!("skipping unreadable tag {}: {}", name, e),
        }
    }

    match options.url_policy {
        UrlPolicy::Keep => {
            for record in records.values() {
                if record.stage_type() == StageType::Url {
                    walk_chain(
                        &records,
                        &record.stage_digest,
                        Some(0),
                        &mut marked_stages,
                        &mut marked_images,
                    );
                }
            }
        }
        UrlPolicy::DeleteUnreferenced => {
            // Only adds blob protection for URL stages a tag walk reached.
            for record in records.values() {
                if record.stage_type() == StageType::Url
                    && marked_stages.contains(&record.stage_digest)
                {
                    marked_images.insert(record.image_digest.clone());
                }
            }
        }
        UrlPolicy::DeleteAll => {
            for record in records.values() {
                if record.stage_type() == StageType::Url {
                    marked_images.remove(&record.image_digest);
                }
            }
        }
    }

    let doomed_images: Vec<String> = store
        .list(Namespace::Images)
        .await?
        .into_iter()
        .filter(|d| !marked_images.contains(d))
        .collect();
    let doomed_stages: Vec<String> = on_disk_stages
        .into_iter()
        .filter(|d| !marked_stages.contains(d))
        .collect();

    let plan = GcPlan {
        doomed_images,
        doomed_stages,
        marked_images: marked_images.len(),
        marked_stages: marked_stages.len(),
    };

    if options.dry_run {
        return Ok(plan);
    }

    for digest in &plan.doomed_images {
        debug!("removing image {}", digest);
        store.delete(Namespace::Images, digest).await?;
    }
    for digest in &plan.doomed_stages {
        debug!("removing stage {}", digest);
        store.delete(Namespace::Stages, digest).await?;
    }
    info!(
        "gc removed {} images and {} stages",
        plan.doomed_images.len(),
        plan.doomed_stages.len()
    );

    Ok(plan)
}

/// All readable tags, sorted by name
pub async fn tags(store: &CacheStore) -> SqueakerResult<Vec<Tag>> {
    let mut out = vec![];
    for name in store.list(Namespace::Tags).await? {
        match store.load_tag_opt(&name).await {
            Ok(Some(tag)) => out.push(tag),
            Ok(None) => {}
            Err(e) => warn!("skipping unreadable tag {}: {}", name, e),
        }
    }
    Ok(out)
}

/// Remove tags by name; missing names are fine
pub async fn untag(store: &CacheStore, names: &[String]) -> SqueakerResult<()> {
    for name in names {
        store.delete(Namespace::Tags, name).await?;
        info!("untagged {}", name);
    }
    Ok(())
}

/// Remove stage records by digest prefix, returning the resolved digests
pub async fn unstage(store: &CacheStore, prefixes: &[String]) -> SqueakerResult<Vec<String>> {
    let mut removed = vec![];
    for prefix in prefixes {
        let digest = store
            .resolve_prefix(Namespace::Stages, prefix)
            .await?
            .ok_or_else(|| SqueakerError::UnknownReference(prefix.clone()))?;
        store.delete(Namespace::Stages, &digest).await?;
        removed.push(digest);
    }
    Ok(removed)
}

/// A resolved user-facing image reference
#[derive(Debug, Clone)]
pub enum ImageRef {
    Tag(Tag),
    Image(String),
}

impl ImageRef {
    pub fn image_digest(&self) -> &str {
        match self {
            Self::Tag(tag) => &tag.image_digest,
            Self::Image(digest) => digest,
        }
    }
}

/// Resolve a short reference: exact tag name first, then unambiguous image
/// digest prefix
pub async fn resolve_reference(store: &CacheStore, reference: &str) -> SqueakerResult<ImageRef> {
    if let Some(tag) = store.load_tag_opt(reference).await? {
        return Ok(ImageRef::Tag(tag));
    }
    if let Some(digest) = store.resolve_prefix(Namespace::Images, reference).await? {
        return Ok(ImageRef::Image(digest));
    }
    Err(SqueakerError::UnknownReference(reference.to_string()))
}
