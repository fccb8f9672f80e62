//! Run command - start a cached image interactively

use crate::archive;
use crate::cli::args::RunArgs;
use crate::config::Config;
use crate::error::{SqueakerError, SqueakerResult};
use crate::maintain::{resolve_reference, ImageRef};
use crate::resolver::StageResolver;
use crate::store::CacheStore;
use crate::ui::ConsoleProgress;
use crate::vm::{SqueakVm, DIRECTORY_FILE};
use console::style;
use std::collections::HashSet;
use std::env;
use tempfile::TempDir;
use tracing::{debug, info};

/// Execute the run command
pub async fn run(args: RunArgs, config: &Config, store: CacheStore) -> SqueakerResult<()> {
    let vm_path = super::resolve_vm_path(args.vm.clone(), config)?;
    let headless = args.headless_override().unwrap_or(config.vm.headless);

    let invoking_dir =
        env::current_dir().map_err(|e| SqueakerError::io("getting current directory", e))?;
    let vm = SqueakVm::new(vm_path, headless, invoking_dir.clone());

    // Tags go through the stage graph so a lost blob self-repairs; a raw
    // digest can only use what is on disk.
    let image_digest = match resolve_reference(&store, &args.image).await? {
        ImageRef::Tag(tag) => {
            let stage = store.load_stage(&tag.stage_digest).await?;
            let progress = ConsoleProgress::new();
            let resolver = StageResolver::new(
                &store,
                &vm,
                &progress,
                invoking_dir.clone(),
                HashSet::new(),
            );
            resolver.ensure_image_present(&stage).await?.image_digest
        }
        ImageRef::Image(digest) => digest,
    };
    debug!("running image {}", &image_digest[..12]);

    let workdir = TempDir::new().map_err(|e| SqueakerError::io("creating workdir", e))?;
    archive::extract_image(&store.blob_path(&image_digest), workdir.path())?;

    if args.root {
        let dir_file = workdir.path().join(DIRECTORY_FILE);
        tokio::fs::write(&dir_file, invoking_dir.to_string_lossy().as_bytes())
            .await
            .map_err(|e| SqueakerError::io(format!("writing {}", dir_file.display()), e))?;
    }

    let exit_code = vm.run_interactive(workdir.path(), &args.args).await?;

    let audit = store
        .record_recent_changes(
            &workdir.path().join(archive::CHANGES_NAME),
            config.cache.recent_changes_keep,
        )
        .await?;
    info!("changes recorded at {}", audit.display());

    if exit_code != 0 {
        println!(
            "{} VM exited with code {}",
            style("!").yellow(),
            exit_code
        );
    }
    Ok(())
}
