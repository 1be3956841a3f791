//! Image preprocessing module for CAPTCHA recognition
//!
//! Turns raw image bytes into a binarized, upscaled matrix through one of the
//! named pipeline variants.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, PipelineVariant, PreprocessingResult, StepTiming};
