//! Byte-streaming URL source
//!
//! HTTP(S) bodies stream to disk with a content-length hint for progress;
//! `file:` URLs read the local path directly. No retries: the transport
//! offers what it offers.

use crate::error::{SqueakerError, SqueakerResult};
use crate::ui::Progress;
use reqwest::Url;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Download `url` into `dest`, reporting progress as bytes arrive
pub async fn fetch_to_file(url: &str, dest: &Path, progress: &dyn Progress) -> SqueakerResult<()> {
    let parsed =
        Url::parse(url).map_err(|e| SqueakerError::fetch(url, format!("invalid URL: {}", e)))?;

    if parsed.scheme() == "file" {
        return fetch_local(url, &parsed, dest, progress).await;
    }

    let response = reqwest::Client::new().get(parsed).send().await?;
    let status = response.status();
    if !status.is_success() {
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v.to_str().unwrap_or("<binary>")))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SqueakerError::fetch(
            url,
            format!("HTTP {} ({})", status, headers),
        ));
    }

    let expected = response.content_length();
    let mut out = tokio::fs::File::create(dest)
        .await
        .map_err(|e| SqueakerError::io(format!("creating {}", dest.display()), e))?;

    let mut response = response;
    let mut downloaded: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        out.write_all(&chunk)
            .await
            .map_err(|e| SqueakerError::io(format!("writing {}", dest.display()), e))?;
        downloaded += chunk.len() as u64;
        progress.update(downloaded, expected, url);
    }
    out.flush()
        .await
        .map_err(|e| SqueakerError::io(format!("flushing {}", dest.display()), e))?;
    progress.clear();

    debug!(url, bytes = downloaded, "download complete");
    Ok(())
}

async fn fetch_local(
    url: &str,
    parsed: &Url,
    dest: &Path,
    progress: &dyn Progress,
) -> SqueakerResult<()> {
    let src = parsed
        .to_file_path()
        .map_err(|_| SqueakerError::fetch(url, "not a usable file path".to_string()))?;

    let copied = tokio::fs::copy(&src, dest)
        .await
        .map_err(|e| SqueakerError::fetch(url, format!("unreadable: {}", e)))?;

    progress.update(copied, Some(copied), url);
    progress.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::SilentProgress;
    use tempfile::TempDir;

    #[tokio::test]
    async fn file_url_copies_local_path() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("base.zip");
        std::fs::write(&src, b"payload").unwrap();

        let dest = dir.path().join("out");
        let url = format!("file://{}", src.display());
        fetch_to_file(&url, &dest, &SilentProgress).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn single_slash_file_url_works() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("base.zip");
        std::fs::write(&src, b"payload").unwrap();

        let dest = dir.path().join("out");
        let url = format!("file:{}", src.display());
        fetch_to_file(&url, &dest, &SilentProgress).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn missing_local_file_is_fetch_failure() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out");

        let err = fetch_to_file("file:/definitely/not/here", &dest, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, SqueakerError::FetchFailed { .. }));
    }

    #[tokio::test]
    async fn invalid_url_is_fetch_failure() {
        let dir = TempDir::new().unwrap();
        let err = fetch_to_file("::nope::", &dir.path().join("out"), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, SqueakerError::FetchFailed { .. }));
    }
}
