//! Sample-asset bootstrap.
//!
//! Downloads the demo photo once so `mirage --caption "..."` works out of
//! the box without the caller supplying an image. Only the default image
//! path triggers a download; user-supplied paths are never fetched.

use std::path::Path;

use anyhow::{Context, Result};

/// Where the demo image is fetched from.
pub const SAMPLE_IMAGE_URL: &str =
    "https://images.pexels.com/photos/1108099/pexels-photo-1108099.jpeg";

/// Default on-disk location for the demo image.
pub const DEFAULT_IMAGE_PATH: &str = "assets/dogs.jpg";

/// Ensure the sample image exists, downloading it on first use.
pub async fn ensure_sample_image(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    tracing::info!(url = SAMPLE_IMAGE_URL, path = %path.display(), "downloading sample image");

    let bytes = reqwest::get(SAMPLE_IMAGE_URL)
        .await
        .context("failed to download sample image")?
        .error_for_status()
        .context("sample image download was rejected")?
        .bytes()
        .await
        .context("failed to read sample image body")?;

    tokio::fs::write(path, &bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), "sample image ready");
    Ok(())
}
