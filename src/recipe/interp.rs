//! Recipe interpretation
//!
//! Each chunk is stripped and classified by prefix, then threaded through
//! the resolver as a single running "current stage". `from:` establishes or
//! replaces the current stage; everything else derives from it.

use crate::error::{SqueakerError, SqueakerResult};
use crate::recipe::chunks::chunks;
use crate::recipe::literal::{parse_string_literal, parse_symbol_literal, quote_string};
use crate::resolver::StageResolver;
use crate::store::StageRecord;
use tracing::debug;

pub struct Interpreter<'a> {
    resolver: &'a StageResolver<'a>,
}

impl<'a> Interpreter<'a> {
    pub fn new(resolver: &'a StageResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Run a recipe to completion, returning the final stage
    pub async fn run(&self, recipe: &[u8]) -> SqueakerResult<StageRecord> {
        let mut current: Option<StageRecord> = None;

        for chunk in chunks(recipe) {
            let chunk = chunk?;
            let text = chunk.trim();
            if text.is_empty() {
                continue;
            }
            debug!("chunk: {}", text);

            if let Some(arg) = text.strip_prefix("from:") {
                current = Some(self.eval_from(text, arg.trim()).await?);
            } else if let Some(arg) = text.strip_prefix("resource:") {
                let parent = self.require_current(text, &current)?;
                let path = string_arg(text, arg)?;
                current = Some(self.resolver.depend_on_resource(parent, &path).await?);
            } else if let Some(arg) = text.strip_prefix("fileIn:") {
                let parent = self.require_current(text, &current)?;
                let path = string_arg(text, arg)?;

                // A fileIn of a file that isn't there can only be a mistake.
                let full = self.resolver.project_dir().join(&path);
                if !full.is_file() {
                    return Err(SqueakerError::ResourceMissing(full));
                }

                let fingerprinted = self.resolver.depend_on_resource(parent, &path).await?;
                let install = format!("Installer installFile: {}", quote_string(&path));
                current = Some(self.resolver.apply_chunk(fingerprinted, &install).await?);
            } else {
                let parent = self.require_current(text, &current)?;
                current = Some(self.resolver.apply_chunk(parent, text).await?);
            }
        }

        current.ok_or_else(|| SqueakerError::recipe("", "recipe contains no stages"))
    }

    /// `from:` takes either a URL string literal or a `#'tag'` symbol
    async fn eval_from(&self, chunk: &str, arg: &str) -> SqueakerResult<StageRecord> {
        if arg.starts_with('#') {
            let name = parse_symbol_literal(arg)
                .map_err(|reason| SqueakerError::recipe(chunk, reason))?;
            let tag = self.resolver.store().load_tag(&name).await?;
            return self.resolver.store().load_stage(&tag.stage_digest).await;
        }

        let url = parse_string_literal(arg)
            .map_err(|reason| SqueakerError::recipe(chunk, reason))?;
        self.resolver.fetch_url(&url).await
    }

    fn require_current(
        &self,
        chunk: &str,
        current: &Option<StageRecord>,
    ) -> SqueakerResult<StageRecord> {
        current
            .clone()
            .ok_or_else(|| SqueakerError::recipe(chunk, "no base image yet; start with from:"))
    }
}

fn string_arg(chunk: &str, arg: &str) -> SqueakerResult<String> {
    parse_string_literal(arg.trim()).map_err(|reason| SqueakerError::recipe(chunk, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Namespace, StageType, Tag};
    use crate::testutil::Fixture;

    async fn run(fx: &Fixture, recipe: &str) -> SqueakerResult<StageRecord> {
        let resolver = fx.resolver();
        let final_stage = Interpreter::new(&resolver).run(recipe.as_bytes()).await;
        final_stage
    }

    #[tokio::test]
    async fn fetch_only_recipe() {
        let fx = Fixture::new();
        let recipe = format!("from: '{}'!\n", fx.base_url());

        let tip = run(&fx, &recipe).await.unwrap();
        assert_eq!(tip.stage_type(), StageType::Url);
        assert!(fx.store.has_blob(&tip.image_digest));
    }

    #[tokio::test]
    async fn chained_chunks_build_in_order() {
        let fx = Fixture::new();
        let recipe = format!("from: '{}'!\nX!\nY!\n", fx.base_url());

        let tip = run(&fx, &recipe).await.unwrap();
        assert_eq!(tip.stage_type(), StageType::Stage);

        // url + X + Y
        let stages = fx.store.list(Namespace::Stages).await.unwrap();
        assert_eq!(stages.len(), 3);
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let fx = Fixture::new();
        let recipe = format!("from: '{}'!\nX!\nY!\n", fx.base_url());

        let first = run(&fx, &recipe).await.unwrap();
        let images = fx.store.list(Namespace::Images).await.unwrap();
        let stages = fx.store.list(Namespace::Stages).await.unwrap();

        let second = run(&fx, &recipe).await.unwrap();
        assert_eq!(first.image_digest, second.image_digest);
        assert_eq!(images, fx.store.list(Namespace::Images).await.unwrap());
        assert_eq!(stages, fx.store.list(Namespace::Stages).await.unwrap());
    }

    #[tokio::test]
    async fn resource_directive_threads_through() {
        let fx = Fixture::new();
        std::fs::write(fx.dir.path().join("data.txt"), b"v1").unwrap();
        let recipe = format!("from: '{}'!\nresource: 'data.txt'!\nuse-data!\n", fx.base_url());

        let v1_tip = run(&fx, &recipe).await.unwrap();

        std::fs::write(fx.dir.path().join("data.txt"), b"v2").unwrap();
        let v2_tip = run(&fx, &recipe).await.unwrap();
        assert_ne!(v1_tip.stage_digest, v2_tip.stage_digest);

        // The url stage was reused: exactly one url record exists.
        let mut url_stages = 0;
        for digest in fx.store.list(Namespace::Stages).await.unwrap() {
            let rec = fx.store.load_stage(&digest).await.unwrap();
            if rec.stage_type() == StageType::Url {
                url_stages += 1;
            }
        }
        assert_eq!(url_stages, 1);
    }

    #[tokio::test]
    async fn missing_resource_is_allowed() {
        let fx = Fixture::new();
        let recipe = format!("from: '{}'!\nresource: 'data.txt'!\n", fx.base_url());

        let absent_tip = run(&fx, &recipe).await.unwrap();
        assert_eq!(absent_tip.stage_type(), StageType::Resource);

        std::fs::write(fx.dir.path().join("data.txt"), b"appeared").unwrap();
        let present_tip = run(&fx, &recipe).await.unwrap();
        assert_ne!(absent_tip.stage_digest, present_tip.stage_digest);
    }

    #[tokio::test]
    async fn file_in_requires_the_file() {
        let fx = Fixture::new();
        let recipe = format!("from: '{}'!\nfileIn: 'code.st'!\n", fx.base_url());

        let err = run(&fx, &recipe).await.unwrap_err();
        assert!(matches!(err, SqueakerError::ResourceMissing(_)));
    }

    #[tokio::test]
    async fn file_in_fingerprints_then_installs() {
        let fx = Fixture::new();
        std::fs::write(fx.dir.path().join("code.st"), b"Object subclass: #Thing").unwrap();
        let recipe = format!("from: '{}'!\nfileIn: 'code.st'!\n", fx.base_url());

        let tip = run(&fx, &recipe).await.unwrap();
        assert_eq!(tip.stage_type(), StageType::Stage);
        match &tip.body {
            crate::store::StageBody::Stage { chunk, .. } => {
                assert_eq!(chunk, "Installer installFile: 'code.st'");
            }
            _ => panic!("expected a stage body"),
        }

        // Changing the file's contents rebuilds the install stage.
        std::fs::write(fx.dir.path().join("code.st"), b"Object subclass: #Other").unwrap();
        let changed = run(&fx, &recipe).await.unwrap();
        assert_ne!(tip.stage_digest, changed.stage_digest);
    }

    #[tokio::test]
    async fn from_tag_loads_without_rebuild() {
        let fx = Fixture::new();
        let base_recipe = format!("from: '{}'!\nX!\n", fx.base_url());
        let tip = run(&fx, &base_recipe).await.unwrap();
        fx.store
            .write_tag(&Tag {
                tag: "base".to_string(),
                stage_digest: tip.stage_digest.clone(),
                image_digest: tip.image_digest.clone(),
            })
            .await
            .unwrap();

        let tagged = run(&fx, "from: #'base'!\nY!\n").await.unwrap();
        assert_eq!(tagged.parent(), Some(tip.stage_digest.as_str()));
    }

    #[tokio::test]
    async fn from_unknown_tag_fails() {
        let fx = Fixture::new();
        let err = run(&fx, "from: #'nope'!\n").await.unwrap_err();
        assert!(matches!(err, SqueakerError::TagNotFound(_)));
    }

    #[tokio::test]
    async fn command_before_from_is_an_error() {
        let fx = Fixture::new();
        let err = run(&fx, "do-something!\n").await.unwrap_err();
        assert!(matches!(err, SqueakerError::RecipeParse { .. }));
    }

    #[tokio::test]
    async fn malformed_literal_names_the_chunk() {
        let fx = Fixture::new();
        let err = run(&fx, "from: no-quotes!\n").await.unwrap_err();
        match err {
            SqueakerError::RecipeParse { chunk, .. } => {
                assert_eq!(chunk, "from: no-quotes");
            }
            other => panic!("expected RecipeParse, got {other}"),
        }
    }

    #[tokio::test]
    async fn empty_recipe_is_an_error() {
        let fx = Fixture::new();
        assert!(run(&fx, "").await.is_err());
        assert!(run(&fx, "\n\n!\n").await.is_err());
    }

    #[tokio::test]
    async fn escaped_bang_reaches_the_vm() {
        let fx = Fixture::new();
        let recipe = format!(
            "from: '{}'!\nTranscript showln: 'bang!!'!\n",
            fx.base_url()
        );

        let tip = run(&fx, &recipe).await.unwrap();
        match &tip.body {
            crate::store::StageBody::Stage { chunk, .. } => {
                assert_eq!(chunk, "Transcript showln: 'bang!'");
            }
            _ => panic!("expected a stage body"),
        }
    }
}
