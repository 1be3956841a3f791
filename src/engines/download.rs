//! Model and training-data caching shared by the engines

use crate::error::OcrError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Per-user cache directory for downloaded engine assets
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("captcha-solver")
}

/// Return the cached copy of `filename` under `dir`, downloading it from `url` if missing
pub fn ensure_cached(url: &str, dir: &Path, filename: &str) -> Result<PathBuf, OcrError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create cache directory: {}", e))
    })?;

    let path = dir.join(filename);

    // Download if not cached
    if !path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &path)?;
        tracing::info!("Downloaded {} to {:?}", filename, path);
    } else {
        tracing::info!("Using cached {} from {:?}", filename, path);
    }

    Ok(path)
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), OcrError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| OcrError::InitializationError(format!("Failed to download {}: {}", url, e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        OcrError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    // Write to a sibling file, then move into place
    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create {:?}: {}", partial, e))
    })?;
    file.write_all(&buffer)
        .map_err(|e| OcrError::InitializationError(format!("Failed to write {:?}: {}", partial, e)))?;
    std::fs::rename(&partial, path).map_err(|e| {
        OcrError::InitializationError(format!("Failed to move {:?} into place: {}", path, e))
    })?;

    Ok(())
}
