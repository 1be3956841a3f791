//! Leptess/Tesseract engine implementation
//!
//! Tesseract-based OCR engine. Applies the page segmentation mode and
//! character whitelist of each recognition config.
//! Uses tesseract-static crate for static linking (no system dependencies).
//! Downloads tessdata (training data) automatically on first use.

use super::download;
use crate::config::Config;
use crate::engine::{EngineMode, OcrConfig, OcrEngine};
use crate::error::OcrError;
use image::GrayImage;
use std::path::PathBuf;
use tesseract_static::tesseract::Tesseract;

/// Tesseract OCR Engine
///
/// A fresh Tesseract handle is created for every call, so concurrent
/// recognitions never share native engine state.
pub struct LeptessEngine {
    /// Path to tessdata directory
    tessdata_path: String,
    /// Recognition language
    language: String,
}

impl LeptessEngine {
    /// Create a new Tesseract-based OCR engine
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let language = config.default_language.clone();

        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            // Ensure tessdata is available (download if needed)
            None => ensure_tessdata_available(&language)?,
        };

        // Validate that tessdata is accessible by doing a test initialization
        let test_tess = Tesseract::new(Some(&tessdata_path), Some(&language)).map_err(|e| {
            OcrError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;
        drop(test_tess);

        tracing::info!(
            "Leptess engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self {
            tessdata_path,
            language,
        })
    }
}

impl OcrEngine for LeptessEngine {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - full support for page segmentation modes and whitelists"
    }

    fn recognize(&self, image: &GrayImage, config: &OcrConfig) -> Result<String, OcrError> {
        let (width, height) = image.dimensions();

        // Convert to BMP in memory (BMP is always supported by leptonica)
        let mut bmp_data = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| OcrError::RecognitionError(format!("Failed to convert to BMP: {}", e)))?;

        if config.engine_mode != EngineMode::Default {
            // The engine mode is fixed when the traineddata is loaded
            tracing::debug!(
                "Ignoring --oem {} for leptess; using the traineddata default",
                config.engine_mode.code()
            );
        }

        // The engine itself failing to start means no strategy can succeed
        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| OcrError::EngineUnavailable(format!("Failed to create Tesseract: {}", e)))?;

        tess = tess
            .set_variable(
                "tessedit_pageseg_mode",
                &config.page_seg_mode.code().to_string(),
            )
            .map_err(|e| {
                OcrError::RecognitionError(format!("Failed to set page segmentation mode: {}", e))
            })?;

        if let Some(whitelist) = &config.whitelist {
            tess = tess
                .set_variable("tessedit_char_whitelist", whitelist)
                .map_err(|e| {
                    OcrError::RecognitionError(format!("Failed to set whitelist: {}", e))
                })?;
        }

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            OcrError::RecognitionError(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        tess = tess
            .recognize()
            .map_err(|e| OcrError::RecognitionError(format!("Failed to recognize text: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| OcrError::RecognitionError(format!("Failed to get text: {}", e)))?;

        tracing::debug!(
            "Tesseract ({}) read {:?} from {}x{} image",
            config,
            text.trim(),
            width,
            height
        );

        Ok(text.trim().to_string())
    }
}

/// Ensure tessdata is available, downloading if needed
fn ensure_tessdata_available(language: &str) -> Result<String, OcrError> {
    let dir = tessdata_cache_dir();
    download::ensure_cached(
        &tessdata_url(language),
        &dir,
        &format!("{}.traineddata", language),
    )?;

    // Tesseract expects the directory, not the file
    dir.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| OcrError::InitializationError("Invalid tessdata path".to_string()))
}

fn tessdata_cache_dir() -> PathBuf {
    download::cache_dir().join("tessdata")
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // Use tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
