//! Dot command - stage graph as Graphviz DOT

use crate::error::SqueakerResult;
use crate::maintain;
use crate::store::{CacheStore, Namespace, StageBody, StageRecord};
use tracing::warn;

/// Execute the dot command
pub async fn dot(store: CacheStore) -> SqueakerResult<()> {
    println!("digraph stages {{");
    println!("  rankdir=RL;");
    println!("  node [shape=ellipse, fontsize=10];");

    for digest in store.list(Namespace::Stages).await? {
        match store.load_stage_opt(&digest).await {
            Ok(Some(record)) => {
                println!(
                    "  \"{}\" [label=\"{}\"];",
                    record.stage_digest,
                    escape(&node_label(&record))
                );
                if let Some(parent) = record.parent() {
                    println!("  \"{}\" -> \"{}\";", record.stage_digest, parent);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("skipping unreadable stage record {}: {}", digest, e),
        }
    }

    for tag in maintain::tags(&store).await? {
        println!(
            "  \"tag:{}\" [label=\"{}\", shape=box];",
            tag.tag,
            escape(&tag.tag)
        );
        println!("  \"tag:{}\" -> \"{}\";", tag.tag, tag.stage_digest);
    }

    println!("}}");
    Ok(())
}

fn node_label(record: &StageRecord) -> String {
    let detail = match &record.body {
        StageBody::Url { url } => url.clone(),
        StageBody::Stage { chunk, .. } => preview(chunk),
        StageBody::Resource { resource_path, .. } => resource_path.clone(),
    };
    format!(
        "{} {}\n{}",
        record.stage_type(),
        record.short_digest(),
        detail
    )
}

/// First line of a chunk, clipped for the label
fn preview(chunk: &str) -> String {
    let line = chunk.lines().next().unwrap_or("");
    let mut out: String = line.chars().take(40).collect();
    if line.chars().count() > 40 {
        out.push('…');
    }
    out
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_clips_long_chunks() {
        let long = "a".repeat(100);
        let clipped = preview(&long);
        assert!(clipped.chars().count() <= 41);
        assert!(clipped.ends_with('…'));

        assert_eq!(preview("short"), "short");
        assert_eq!(preview("first\nsecond"), "first");
    }

    #[test]
    fn escape_quotes_and_newlines() {
        assert_eq!(escape("a\"b\nc"), "a\\\"b\\nc");
    }
}
