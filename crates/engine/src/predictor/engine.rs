//! Prediction engine
//!
//! Owns the loaded bundle and the engine configuration. All scoring entry
//! points take `&self`: there is no mutable state, so one engine can be
//! shared across every request handler and across rayon workers.

use super::features::FeatureNormalizer;
use super::output::build_result;
use super::Classifier;
use crate::artifacts::{ArtifactBundle, ArtifactLoader};
use crate::config::EngineConfig;
use crate::error::{EngineError, LoadError, ValidationError};
use crate::introspection::{self, FeatureImportance, ModelInfo};
use crate::models::{
    BatchOutput, BatchSummary, InferenceRecord, InferenceResult, ModelChoice, RecordFailure,
    RecordOutcome, RiskLevel,
};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, warn};

/// Probability together with the model that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub probability: f64,
    pub model_used: ModelChoice,
}

/// Scores records against one immutable artifact bundle
#[derive(Debug, Clone)]
pub struct PredictionEngine {
    bundle: ArtifactBundle,
    config: EngineConfig,
}

impl PredictionEngine {
    pub fn new(bundle: ArtifactBundle, config: EngineConfig) -> Self {
        Self { bundle, config }
    }

    /// Load the bundle named by `config.artifact_dir`
    pub fn load(config: EngineConfig) -> Result<Self, LoadError> {
        let bundle = ArtifactLoader::new(&config.artifact_dir)
            .expect_features(config.expected_features)
            .load()?;
        Ok(Self::new(bundle, config))
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> FeatureNormalizer<'_> {
        FeatureNormalizer::new(self.bundle.features(), self.bundle.scaler())
    }

    /// Validate and scale one record into model input order
    pub fn normalize(&self, record: &InferenceRecord) -> Result<Vec<f64>, ValidationError> {
        self.normalizer().normalize(record)
    }

    /// Probability of theft for an already normalized vector
    pub fn predict(&self, vector: &[f64], choice: ModelChoice) -> Result<f64, EngineError> {
        self.score(vector, choice).map(|scored| scored.probability)
    }

    /// Run the chosen model, falling back when the primary is disabled or
    /// produces a non-finite score
    pub fn score(&self, vector: &[f64], choice: ModelChoice) -> Result<Scored, EngineError> {
        let expected = self.bundle.feature_count();
        if vector.len() != expected {
            return Err(EngineError::DimensionMismatch {
                expected,
                got: vector.len(),
            });
        }
        score_with(
            self.bundle.primary(),
            self.bundle.fallback(),
            self.config.primary_enabled,
            vector,
            choice,
        )
    }

    /// Apply the default threshold and check it lies in (0, 1)
    pub fn resolve_threshold(&self, threshold: Option<f64>) -> Result<f64, EngineError> {
        let threshold = threshold.unwrap_or(self.config.default_threshold);
        if threshold > 0.0 && threshold < 1.0 {
            Ok(threshold)
        } else {
            Err(EngineError::InvalidThreshold(threshold))
        }
    }

    /// Validate, score and classify one record
    pub fn predict_record(
        &self,
        record: &InferenceRecord,
        choice: ModelChoice,
        threshold: Option<f64>,
    ) -> Result<InferenceResult, EngineError> {
        let threshold = self.resolve_threshold(threshold)?;
        let result = self.score_record(record, choice, threshold)?;
        debug!(
            probability = result.probability,
            model = %result.model_used,
            risk = %result.risk_level,
            "Record scored"
        );
        Ok(result)
    }

    /// Score every record independently, keeping submission order.
    ///
    /// A record that fails validation gets an error entry in its slot; the
    /// rest of the batch is unaffected.
    pub fn predict_batch(
        &self,
        records: &[InferenceRecord],
        choice: ModelChoice,
        threshold: Option<f64>,
    ) -> Result<BatchOutput, EngineError> {
        if records.len() > self.config.max_batch_size {
            return Err(EngineError::BatchTooLarge {
                size: records.len(),
                max: self.config.max_batch_size,
            });
        }
        let threshold = self.resolve_threshold(threshold)?;
        let start = Instant::now();

        let outcome = |record: &InferenceRecord| match self.score_record(record, choice, threshold) {
            Ok(result) => RecordOutcome::Scored(result),
            Err(e) => RecordOutcome::Failed(RecordFailure::new(record.customer_id.clone(), &e)),
        };

        let parallel = records.len() >= self.config.parallel_threshold;
        let outcomes: Vec<RecordOutcome> = if parallel {
            records.par_iter().map(&outcome).collect()
        } else {
            records.iter().map(&outcome).collect()
        };

        let summary = summarize(&outcomes, choice, threshold);
        debug!(
            total = summary.total,
            failed = summary.failed,
            parallel,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Batch scored"
        );

        Ok(BatchOutput {
            records: outcomes,
            summary,
        })
    }

    pub fn model_info(&self) -> ModelInfo {
        introspection::model_info(&self.bundle)
    }

    /// Features by descending importance; `None` returns all of them
    pub fn top_features(&self, n: Option<usize>) -> Vec<FeatureImportance> {
        introspection::top_features(&self.bundle, n)
    }

    fn score_record(
        &self,
        record: &InferenceRecord,
        choice: ModelChoice,
        threshold: f64,
    ) -> Result<InferenceResult, EngineError> {
        let vector = self.normalize(record)?;
        let scored = self.score(&vector, choice)?;
        Ok(build_result(
            record.customer_id.clone(),
            scored.probability,
            threshold,
            scored.model_used,
        ))
    }
}

/// Fallback policy over any pair of classifiers. A score that is still
/// non-finite after fallback is an error, never a probability.
fn score_with(
    primary: &dyn Classifier,
    fallback: &dyn Classifier,
    primary_enabled: bool,
    vector: &[f64],
    choice: ModelChoice,
) -> Result<Scored, EngineError> {
    match choice {
        ModelChoice::Primary if primary_enabled => {
            let probability = primary.score(vector);
            if probability.is_finite() {
                return Ok(Scored {
                    probability,
                    model_used: ModelChoice::Primary,
                });
            }
            warn!(probability, "Primary model produced a non-finite score, using fallback");
        }
        ModelChoice::Primary => debug!("Primary model disabled, using fallback"),
        ModelChoice::Fallback => {}
    }

    let probability = fallback.score(vector);
    if !probability.is_finite() {
        return Err(EngineError::NonFiniteScore {
            model: ModelChoice::Fallback.as_str(),
        });
    }
    Ok(Scored {
        probability,
        model_used: ModelChoice::Fallback,
    })
}

fn summarize(outcomes: &[RecordOutcome], model: ModelChoice, threshold: f64) -> BatchSummary {
    let scored: Vec<&InferenceResult> = outcomes.iter().filter_map(RecordOutcome::result).collect();
    let mean_probability = if scored.is_empty() {
        None
    } else {
        Some(scored.iter().map(|r| r.probability).sum::<f64>() / scored.len() as f64)
    };

    BatchSummary {
        total: outcomes.len(),
        flagged: scored.iter().filter(|r| r.prediction).count(),
        failed: outcomes.len() - scored.len(),
        high_risk: scored
            .iter()
            .filter(|r| r.risk_level == RiskLevel::High)
            .count(),
        mean_probability,
        model,
        threshold,
        completed_at: chrono::Utc::now(),
    }
}
