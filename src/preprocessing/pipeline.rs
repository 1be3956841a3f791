use crate::config::PreprocessingParams;
use crate::decode;
use crate::error::OcrError;
use image::GrayImage;
use serde::Serialize;
use std::time::Instant;

use super::steps;

/// Side of the structuring element used by the morphological cleanup
const MORPH_ELEMENT_SIZE: u32 = 2;

/// Named preprocessing variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVariant {
    /// Steps: grayscale, contrast, adaptive threshold, morphological close,
    /// polarity, upscale
    Advanced,
    /// Steps: grayscale, global threshold, upscale.
    /// Cheap fallback for high-contrast, evenly lit inputs
    Simple,
}

impl PipelineVariant {
    /// Get the variant name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advanced => "advanced",
            Self::Simple => "simple",
        }
    }

    /// Ordered stage names, decode excluded
    pub fn stages(&self) -> &'static [&'static str] {
        match self {
            Self::Advanced => &[
                "grayscale",
                "contrast",
                "adaptive_threshold",
                "morph_close",
                "polarity",
                "upscale",
            ],
            Self::Simple => &["grayscale", "global_threshold", "upscale"],
        }
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Preprocessed image (not serialized)
    #[serde(skip)]
    pub image: GrayImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Variant used
    pub variant: String,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Preprocessing pipeline that turns raw image bytes into a recognizer-ready matrix
pub struct Pipeline<'a> {
    variant: PipelineVariant,
    params: &'a PreprocessingParams,
}

impl<'a> Pipeline<'a> {
    pub fn new(variant: PipelineVariant, params: &'a PreprocessingParams) -> Self {
        Self { variant, params }
    }

    /// Decode and process an image according to the configured variant
    pub fn process(&self, bytes: &[u8]) -> Result<PreprocessingResult, OcrError> {
        let start = Instant::now();
        let mut timings = Vec::new();
        let params = self.params;

        let img = match self.variant {
            PipelineVariant::Advanced => {
                let color = timed("decode", &mut timings, || decode::decode_color(bytes))?;
                let mut img = timed("grayscale", &mut timings, || steps::grayscale::apply(color))?;
                img = timed("contrast", &mut timings, || {
                    steps::contrast::apply(img, params.clip_limit, params.tile_grid)
                })?;
                img = timed("adaptive_threshold", &mut timings, || {
                    steps::threshold::adaptive(img, params.block_size, params.threshold_offset)
                })?;
                img = timed("morph_close", &mut timings, || {
                    steps::morphology::close(img, MORPH_ELEMENT_SIZE)
                })?;
                img = timed("polarity", &mut timings, || {
                    steps::polarity::apply(img, params.polarity_midpoint)
                })?;
                timed("upscale", &mut timings, || {
                    steps::upscale::apply(img, params.upscale_factor)
                })?
            }
            PipelineVariant::Simple => {
                // Grayscale conversion happens as part of decoding in this variant
                let img = timed("grayscale", &mut timings, || decode::decode_grayscale(bytes))?;
                let img = timed("global_threshold", &mut timings, || {
                    steps::threshold::global(img, params.global_threshold)
                })?;
                timed("upscale", &mut timings, || {
                    steps::upscale::apply(img, params.upscale_factor)
                })?
            }
        };

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "Preprocessed with '{}' variant in {}ms ({}x{})",
            self.variant.as_str(),
            total_time_ms,
            img.width(),
            img.height()
        );

        Ok(PreprocessingResult {
            image: img,
            total_time_ms,
            variant: self.variant.as_str().to_string(),
            steps: timings,
        })
    }
}

fn timed<T, F>(name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> Result<T, OcrError>
where
    F: FnOnce() -> Result<T, OcrError>,
{
    let step_start = Instant::now();
    let result = step_fn()?;
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    Ok(result)
}
