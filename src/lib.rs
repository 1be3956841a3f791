//! CAPTCHA solving core and HTTP server
//!
//! Raw image bytes are decoded, run through a small set of preprocessing
//! pipelines, recognized by an OCR engine under several configurations, and
//! the normalized results are reconciled by plurality vote.

pub mod config;
pub mod decode;
pub mod engine;
pub mod engines;
pub mod error;
pub mod preprocessing;
pub mod server;
pub mod solver;

pub use config::{Config, PreprocessingParams, SolverParams};
pub use engine::{OcrConfig, OcrEngine};
pub use error::OcrError;
pub use solver::{Solution, Solver, StrategySet};
