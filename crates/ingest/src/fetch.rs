//! Remote document retrieval.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::document::ExtractionError;

/// Download a document from a URL and save it locally.
///
/// Returns the path the bytes were written to.
pub async fn fetch_document(url: &str, save_path: &Path) -> Result<PathBuf, ExtractionError> {
    info!("Downloading document from {}", url);

    let response = reqwest::get(url).await?.error_for_status()?;
    let bytes = response.bytes().await?;

    if let Some(parent) = save_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(save_path, &bytes)?;

    info!("Saved {} bytes to {}", bytes.len(), save_path.display());
    Ok(save_path.to_path_buf())
}
