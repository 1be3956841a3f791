use crate::engine::{OcrConfig, PageSegMode, ALPHANUMERIC};
use crate::preprocessing::PipelineVariant;
use serde::Serialize;

/// One recognition attempt: a preprocessing variant paired with an engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    pub variant: PipelineVariant,
    pub config: OcrConfig,
}

/// Serializable summary of a strategy
#[derive(Debug, Clone, Serialize)]
pub struct StrategyInfo {
    pub name: String,
    pub variant: PipelineVariant,
    pub stages: &'static [&'static str],
    pub config: String,
}

impl From<&Strategy> for StrategyInfo {
    fn from(strategy: &Strategy) -> Self {
        Self {
            name: strategy.name.to_string(),
            variant: strategy.variant,
            stages: strategy.variant.stages(),
            config: strategy.config.to_string(),
        }
    }
}

/// Ordered list of strategies tried for every image.
///
/// Built once at startup and shared read-only. The order only matters for
/// breaking ties between equally voted answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategySet {
    strategies: Vec<Strategy>,
}

impl StrategySet {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Strategy> {
        self.strategies.iter()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Distinct variants in first-use order
    pub fn variants(&self) -> Vec<PipelineVariant> {
        let mut variants = Vec::new();
        for strategy in &self.strategies {
            if !variants.contains(&strategy.variant) {
                variants.push(strategy.variant);
            }
        }
        variants
    }

    pub fn info(&self) -> Vec<StrategyInfo> {
        self.strategies.iter().map(StrategyInfo::from).collect()
    }
}

impl Default for StrategySet {
    fn default() -> Self {
        Self::new(vec![
            Strategy {
                name: "advanced-line-alnum",
                variant: PipelineVariant::Advanced,
                config: OcrConfig::new(PageSegMode::SingleLine).with_whitelist(ALPHANUMERIC),
            },
            Strategy {
                name: "advanced-word",
                variant: PipelineVariant::Advanced,
                config: OcrConfig::new(PageSegMode::SingleWord),
            },
            Strategy {
                name: "advanced-block",
                variant: PipelineVariant::Advanced,
                config: OcrConfig::new(PageSegMode::SingleBlock),
            },
            Strategy {
                name: "simple-line",
                variant: PipelineVariant::Simple,
                config: OcrConfig::new(PageSegMode::SingleLine),
            },
        ])
    }
}

impl<'a> IntoIterator for &'a StrategySet {
    type Item = &'a Strategy;
    type IntoIter = std::slice::Iter<'a, Strategy>;

    fn into_iter(self) -> Self::IntoIter {
        self.strategies.iter()
    }
}
