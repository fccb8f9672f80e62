//! Build command - derive an image from a recipe

use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::{SqueakerError, SqueakerResult};
use crate::recipe::Interpreter;
use crate::resolver::StageResolver;
use crate::store::{CacheStore, StageType, Tag};
use crate::ui::ConsoleProgress;
use crate::vm::SqueakVm;
use console::style;
use std::collections::HashSet;
use tracing::debug;

/// Execute the build command
pub async fn build(args: BuildArgs, config: &Config, store: CacheStore) -> SqueakerResult<()> {
    let project_dir = args
        .dir
        .canonicalize()
        .map_err(|e| SqueakerError::io(format!("resolving {}", args.dir.display()), e))?;

    let recipe_path = args
        .file
        .clone()
        .unwrap_or_else(|| project_dir.join("Squeakerfile.st"));
    let recipe = tokio::fs::read(&recipe_path)
        .await
        .map_err(|e| SqueakerError::io(format!("reading recipe {}", recipe_path.display()), e))?;
    debug!("recipe: {}", recipe_path.display());

    let vm_path = super::resolve_vm_path(args.vm.clone(), config)?;
    let headless = args.headless_override().unwrap_or(config.vm.headless);
    let vm = SqueakVm::new(vm_path, headless, project_dir.clone());

    let mut no_cache = HashSet::new();
    if args.no_cache_urls {
        no_cache.insert(StageType::Url);
    }
    if args.no_cache_stages {
        no_cache.insert(StageType::Stage);
    }

    let progress = ConsoleProgress::new();
    let resolver = StageResolver::new(&store, &vm, &progress, project_dir, no_cache);
    let mut final_stage = Interpreter::new(&resolver).run(&recipe).await?;

    if let Some(name) = args.tag {
        final_stage = resolver.ensure_image_present(&final_stage).await?;
        store
            .write_tag(&Tag {
                tag: name.clone(),
                stage_digest: final_stage.stage_digest.clone(),
                image_digest: final_stage.image_digest.clone(),
            })
            .await?;
        eprintln!("{} tagged {}", style("✓").green(), style(&name).cyan());
    }

    println!("{}", final_stage.image_digest);
    Ok(())
}
