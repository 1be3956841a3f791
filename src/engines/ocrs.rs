//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use.
//!
//! ocrs always detects words and lines on its own, so page segmentation modes
//! are applied to its output instead: a single line joins every word with
//! spaces, a single word joins them with nothing, and a block keeps the line
//! breaks. The character whitelist is enforced by filtering.

use super::download;
use crate::config::Config;
use crate::engine::{OcrConfig, OcrEngine as Engine, PageSegMode};
use crate::error::OcrError;
use image::{DynamicImage, GrayImage};
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;
use std::path::Path;

/// Published ocrs models
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// OCR Engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Load the detection and recognition models, fetching them on first use
    pub fn new(_config: &Config) -> Result<Self, OcrError> {
        let model_dir = download::cache_dir().join("models");

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(load_model(
                &model_dir,
                DETECTION_MODEL_URL,
                "text-detection.rten",
            )?),
            recognition_model: Some(load_model(
                &model_dir,
                RECOGNITION_MODEL_URL,
                "text-recognition.rten",
            )?),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| OcrError::InitializationError(format!("Failed to create ocrs engine: {}", e)))?;

        tracing::info!("ocrs engine ready (models in {:?})", model_dir);

        Ok(Self { engine })
    }

    /// Recognized words, grouped by line in reading order
    fn read_lines(&self, image: &GrayImage) -> Result<Vec<Vec<String>>, OcrError> {
        // ImageSource::from_bytes expects interleaved RGB
        let rgb = DynamicImage::ImageLuma8(image.clone()).into_rgb8();
        let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions()).map_err(|e| {
            OcrError::RecognitionError(format!("Invalid image for ocrs: {}", e))
        })?;

        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| OcrError::RecognitionError(format!("Failed to prepare input: {}", e)))?;

        let words = self
            .engine
            .detect_words(&input)
            .map_err(|e| OcrError::RecognitionError(format!("Word detection failed: {}", e)))?;
        let lines = self.engine.find_text_lines(&input, &words);

        let recognized = self
            .engine
            .recognize_text(&input, &lines)
            .map_err(|e| OcrError::RecognitionError(format!("Line recognition failed: {}", e)))?;

        Ok(recognized
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| line.words().map(|word| word.to_string()).collect())
            .collect())
    }
}

impl Engine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies required"
    }

    fn recognize(&self, image: &GrayImage, config: &OcrConfig) -> Result<String, OcrError> {
        let lines = self.read_lines(image)?;
        let text = segment(&lines, config.page_seg_mode);

        Ok(text
            .chars()
            .filter(|&c| c == ' ' || c == '\n' || config.allows(c))
            .collect())
    }
}

fn load_model(dir: &Path, url: &str, filename: &str) -> Result<Model, OcrError> {
    let path = download::ensure_cached(url, dir, filename)?;
    Model::load_file(&path)
        .map_err(|e| OcrError::InitializationError(format!("Failed to load {}: {}", filename, e)))
}

/// Lay out recognized words the way the page segmentation mode asks for
fn segment(lines: &[Vec<String>], mode: PageSegMode) -> String {
    match mode {
        PageSegMode::SingleLine => lines
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" "),
        PageSegMode::SingleWord => lines.iter().flatten().map(String::as_str).collect(),
        PageSegMode::SingleBlock => lines
            .iter()
            .map(|words| words.join(" "))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
