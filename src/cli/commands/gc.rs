//! Gc command - remove unreferenced images and stages

use crate::cli::args::GcArgs;
use crate::error::SqueakerResult;
use crate::maintain::{self, GcOptions, UrlPolicy};
use crate::store::CacheStore;
use console::style;

/// Execute the gc command
pub async fn gc(args: GcArgs, store: CacheStore) -> SqueakerResult<()> {
    let url_policy = if args.delete_all_urls {
        UrlPolicy::DeleteAll
    } else if args.delete_unreferenced_urls {
        UrlPolicy::DeleteUnreferenced
    } else {
        UrlPolicy::Keep
    };

    let keep_intermediate = if args.discard_all_intermediate {
        Some(0)
    } else {
        args.keep_intermediate
    };

    let options = GcOptions {
        keep_intermediate,
        url_policy,
        dry_run: args.dry_run,
    };
    let plan = maintain::gc(&store, &options).await?;

    if plan.is_empty() {
        println!("Nothing to remove.");
        return Ok(());
    }

    if args.dry_run {
        println!("Would remove:");
        for digest in &plan.doomed_images {
            println!("  {} image {}", style("•").red(), digest);
        }
        for digest in &plan.doomed_stages {
            println!("  {} stage {}", style("•").red(), digest);
        }
        println!();
        println!("Dry run - nothing removed.");
    } else {
        println!(
            "{} removed {} image(s) and {} stage(s)",
            style("✓").green(),
            plan.doomed_images.len(),
            plan.doomed_stages.len()
        );
    }

    Ok(())
}
