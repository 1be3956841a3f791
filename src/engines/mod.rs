//! OCR engine implementations
//!
//! This module contains implementations of the OcrEngine trait for different
//! OCR backends. Engines are conditionally compiled based on feature flags.

#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
mod download;

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::OcrError;
use serde::Serialize;
use std::sync::Arc;

/// Information about an available engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// Registry of available OCR engines
pub struct EngineRegistry {
    engines: Vec<Arc<dyn OcrEngine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a new engine registry with all available engines initialized
    #[allow(unused_mut)]
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();

        #[cfg(feature = "engine-ocrs")]
        {
            tracing::info!("Initializing ocrs engine...");
            engines.push(Arc::new(ocrs::OcrsEngine::new(config)?));
        }

        #[cfg(feature = "engine-leptess")]
        {
            tracing::info!("Initializing leptess engine...");
            engines.push(Arc::new(leptess::LeptessEngine::new(config)?));
        }

        Self::from_engines(engines, config.engine.as_deref())
    }

    /// Build a registry from already-initialized engines.
    /// `preferred` names the default; otherwise the first engine is used.
    pub fn from_engines(
        engines: Vec<Arc<dyn OcrEngine>>,
        preferred: Option<&str>,
    ) -> Result<Self, OcrError> {
        let first = engines.first().ok_or_else(|| {
            OcrError::InitializationError(
                "No OCR engines available. Build with --features engine-ocrs or --features engine-leptess".to_string()
            )
        })?;

        let default_engine = match preferred {
            Some(name) if engines.iter().any(|e| e.name() == name) => name.to_string(),
            Some(name) => {
                return Err(OcrError::InitializationError(format!(
                    "Unknown OCR engine '{}'. Available: {}",
                    name,
                    engines.iter().map(|e| e.name()).collect::<Vec<_>>().join(", ")
                )))
            }
            None => first.name().to_string(),
        };

        Ok(Self {
            engines,
            default_engine,
        })
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn OcrEngine>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Get the default engine
    pub fn default_engine(&self) -> Option<Arc<dyn OcrEngine>> {
        self.get(&self.default_engine)
    }

    /// Get the default engine name
    pub fn default_name(&self) -> &str {
        &self.default_engine
    }

    /// List all available engine names
    pub fn list(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Get info about all available engines
    pub fn info(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name(),
                description: e.description(),
            })
            .collect()
    }
}
