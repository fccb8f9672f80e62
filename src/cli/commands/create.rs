//! Create command - extract a cached image into a directory

use crate::archive;
use crate::config::Config;
use crate::error::{SqueakerError, SqueakerResult};
use crate::maintain::{resolve_reference, ImageRef};
use crate::resolver::StageResolver;
use crate::store::CacheStore;
use crate::ui::ConsoleProgress;
use crate::vm::SqueakVm;
use console::style;
use std::collections::HashSet;
use std::path::PathBuf;

/// Execute the create command
pub async fn create(
    image: String,
    dir: PathBuf,
    config: &Config,
    store: CacheStore,
) -> SqueakerResult<()> {
    let image_digest = match resolve_reference(&store, &image).await? {
        ImageRef::Tag(tag) => {
            let stage = store.load_stage(&tag.stage_digest).await?;
            if store.has_blob(&stage.image_digest) {
                stage.image_digest
            } else {
                // The blob was collected; repairing it needs a VM.
                let vm_path = super::resolve_vm_path(None, config)?;
                let vm = SqueakVm::new(vm_path, config.vm.headless, dir.clone());
                let progress = ConsoleProgress::new();
                let resolver =
                    StageResolver::new(&store, &vm, &progress, dir.clone(), HashSet::new());
                resolver.ensure_image_present(&stage).await?.image_digest
            }
        }
        ImageRef::Image(digest) => digest,
    };

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| SqueakerError::io(format!("creating {}", dir.display()), e))?;
    archive::extract_image(&store.blob_path(&image_digest), &dir)?;

    println!(
        "{} extracted {} into {}",
        style("✓").green(),
        &image_digest[..12],
        dir.display()
    );
    Ok(())
}
