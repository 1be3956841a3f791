//! Multi-strategy CAPTCHA solving
//!
//! Every strategy in the [`StrategySet`] preprocesses the image with its
//! pipeline variant, runs the OCR engine with its configuration, and
//! normalizes the output. A failing strategy only loses its own vote; the
//! surviving candidates are reduced to one answer by plurality vote.

pub mod normalize;
pub mod strategy;
pub mod vote;

pub use normalize::NormalizedCandidate;
pub use strategy::{Strategy, StrategyInfo, StrategySet};
pub use vote::Tally;

use crate::config::{Config, PreprocessingParams, SolverParams};
use crate::engine::OcrEngine;
use crate::error::OcrError;
use crate::preprocessing::{Pipeline, PipelineVariant};
use image::GrayImage;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// What one strategy contributed
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// Normalized text that takes part in the vote
    Candidate(NormalizedCandidate),
    /// Engine answered, but too little survived normalization
    Rejected { raw: String },
    /// Decoding, preprocessing, or recognition failed
    Failed(OcrError),
}

/// Per-strategy report returned alongside the answer
#[derive(Debug, Clone, Serialize)]
pub struct AttemptReport {
    pub strategy: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AttemptReport {
    fn new(strategy: &Strategy, outcome: &AttemptOutcome) -> Self {
        let (status, text, error) = match outcome {
            AttemptOutcome::Candidate(c) => ("candidate", Some(c.to_string()), None),
            AttemptOutcome::Rejected { raw } => ("rejected", Some(raw.clone()), None),
            AttemptOutcome::Failed(e) => ("failed", None, Some(e.to_string())),
        };
        Self {
            strategy: strategy.name.to_string(),
            status,
            text,
            error,
        }
    }
}

/// Outcome of solving one image
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    /// Consensus answer, absent when nothing survived
    pub text: Option<String>,
    /// Vote counts in first-seen order
    pub candidates: Vec<Tally>,
    pub attempts: Vec<AttemptReport>,
    pub processing_time_ms: u64,
}

impl Solution {
    pub fn is_solved(&self) -> bool {
        self.text.is_some()
    }
}

/// Runs every strategy against an image and votes on the results
pub struct Solver {
    engine: Arc<dyn OcrEngine>,
    strategies: Arc<StrategySet>,
    preprocessing: PreprocessingParams,
    params: SolverParams,
}

impl Solver {
    pub fn new(
        engine: Arc<dyn OcrEngine>,
        strategies: Arc<StrategySet>,
        preprocessing: PreprocessingParams,
        params: SolverParams,
    ) -> Self {
        Self {
            engine,
            strategies,
            preprocessing,
            params,
        }
    }

    /// Solver with the default strategies and the tunables from `config`
    pub fn from_config(engine: Arc<dyn OcrEngine>, config: &Config) -> Self {
        Self::new(
            engine,
            Arc::new(StrategySet::default()),
            config.preprocessing.clone(),
            config.solver.clone(),
        )
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn strategies(&self) -> &StrategySet {
        &self.strategies
    }

    /// Solve the CAPTCHA in `bytes`.
    ///
    /// "Could not solve" is `Ok` with `text == None`; an `Err` is returned only
    /// when nothing was recognized and the engine reported itself unavailable.
    pub fn solve(&self, bytes: &[u8]) -> Result<Solution, OcrError> {
        let start = Instant::now();

        let prepared = self.prepare(bytes);
        let prepared = &prepared;

        let outcomes: Vec<AttemptOutcome> = if self.params.parallel_strategies {
            std::thread::scope(|scope| {
                let handles: Vec<_> = self
                    .strategies
                    .iter()
                    .map(|strategy| scope.spawn(move || self.attempt(strategy, prepared)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle.join().unwrap_or_else(|_| {
                            AttemptOutcome::Failed(OcrError::Internal(
                                "strategy thread panicked".to_string(),
                            ))
                        })
                    })
                    .collect()
            })
        } else {
            self.strategies
                .iter()
                .map(|strategy| self.attempt(strategy, prepared))
                .collect()
        };

        let candidates: Vec<&NormalizedCandidate> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                AttemptOutcome::Candidate(c) => Some(c),
                _ => None,
            })
            .collect();

        if candidates.is_empty() {
            let unavailable = outcomes.iter().find_map(|outcome| match outcome {
                AttemptOutcome::Failed(e) if e.is_engine_unavailable() => Some(e.clone()),
                _ => None,
            });
            if let Some(err) = unavailable {
                tracing::error!("OCR engine '{}' unavailable: {}", self.engine.name(), err);
                return Err(err);
            }
        }

        let text = vote::consensus(candidates.iter().copied());
        let tallies = vote::tally(candidates.iter().copied());
        let attempts = self
            .strategies
            .iter()
            .zip(&outcomes)
            .map(|(strategy, outcome)| AttemptReport::new(strategy, outcome))
            .collect();
        let processing_time_ms = start.elapsed().as_millis() as u64;

        match &text {
            Some(answer) => tracing::info!(
                "Solved: {} ({} of {} strategies agree, {}ms)",
                answer,
                tallies.iter().map(|t| t.votes).max().unwrap_or(0),
                self.strategies.len(),
                processing_time_ms
            ),
            None => tracing::info!("Could not solve ({}ms)", processing_time_ms),
        }

        Ok(Solution {
            text,
            candidates: tallies,
            attempts,
            processing_time_ms,
        })
    }

    /// Consensus text only
    pub fn solve_text(&self, bytes: &[u8]) -> Result<Option<String>, OcrError> {
        self.solve(bytes).map(|solution| solution.text)
    }

    /// Run each distinct pipeline variant once; strategies sharing a variant
    /// share its output
    fn prepare(&self, bytes: &[u8]) -> Vec<(PipelineVariant, Result<GrayImage, OcrError>)> {
        self.strategies
            .variants()
            .into_iter()
            .map(|variant| {
                let pipeline = Pipeline::new(variant, &self.preprocessing);
                let result = catch_unwind(AssertUnwindSafe(|| pipeline.process(bytes)))
                    .unwrap_or_else(|_| {
                        Err(OcrError::PreprocessingError(format!(
                            "'{}' pipeline panicked",
                            variant.as_str()
                        )))
                    })
                    .map(|processed| {
                        tracing::debug!(
                            "Preprocessed '{}' variant in {}ms ({})",
                            variant.as_str(),
                            processed.total_time_ms,
                            processed
                                .steps
                                .iter()
                                .map(|s| format!("{} {}ms", s.name, s.time_ms))
                                .collect::<Vec<_>>()
                                .join(", ")
                        );
                        processed.image
                    });

                if let Err(e) = &result {
                    tracing::warn!("Preprocessing variant '{}' failed: {}", variant.as_str(), e);
                }
                (variant, result)
            })
            .collect()
    }

    fn attempt(
        &self,
        strategy: &Strategy,
        prepared: &[(PipelineVariant, Result<GrayImage, OcrError>)],
    ) -> AttemptOutcome {
        let image = match prepared.iter().find(|(v, _)| *v == strategy.variant) {
            Some((_, Ok(image))) => image,
            Some((_, Err(e))) => return AttemptOutcome::Failed(e.clone()),
            None => {
                return AttemptOutcome::Failed(OcrError::Internal(format!(
                    "no prepared image for variant '{}'",
                    strategy.variant.as_str()
                )))
            }
        };

        let recognized = catch_unwind(AssertUnwindSafe(|| {
            self.engine.recognize(image, &strategy.config)
        }))
        .unwrap_or_else(|_| {
            Err(OcrError::RecognitionError(
                "engine panicked during recognition".to_string(),
            ))
        });

        match recognized {
            Ok(raw) => match NormalizedCandidate::new(raw.trim(), self.params.min_candidate_len) {
                Some(candidate) => {
                    tracing::debug!("Strategy '{}' read '{}'", strategy.name, candidate);
                    AttemptOutcome::Candidate(candidate)
                }
                None => {
                    tracing::debug!("Strategy '{}' result too short: {:?}", strategy.name, raw);
                    AttemptOutcome::Rejected { raw }
                }
            },
            Err(e) => {
                tracing::warn!("Strategy '{}' failed: {}", strategy.name, e);
                AttemptOutcome::Failed(e)
            }
        }
    }
}
