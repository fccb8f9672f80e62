//! Tag and stage maintenance commands

use crate::error::SqueakerResult;
use crate::maintain;
use crate::store::CacheStore;
use console::style;

/// Execute the tags command
pub async fn tags(store: CacheStore) -> SqueakerResult<()> {
    let tags = maintain::tags(&store).await?;
    if tags.is_empty() {
        println!("No tags.");
        return Ok(());
    }
    for tag in tags {
        println!("{}", tag.tag);
    }
    Ok(())
}

/// Execute the resolve-tag command
pub async fn resolve_tag(tag: String, store: CacheStore) -> SqueakerResult<()> {
    let tag = store.load_tag(&tag).await?;
    println!("{}", tag.image_digest);
    Ok(())
}

/// Execute the untag command
pub async fn untag(names: Vec<String>, store: CacheStore) -> SqueakerResult<()> {
    maintain::untag(&store, &names).await?;
    println!("{} untagged {} name(s)", style("✓").green(), names.len());
    Ok(())
}

/// Execute the unstage command
pub async fn unstage(prefixes: Vec<String>, store: CacheStore) -> SqueakerResult<()> {
    for digest in maintain::unstage(&store, &prefixes).await? {
        println!("{}", digest);
    }
    Ok(())
}
