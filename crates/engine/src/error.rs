//! Error taxonomy for the scoring engine
//!
//! Load errors are fatal at startup. Validation and engine errors are
//! request-scoped: they are reported to the caller and never leave the
//! engine in a different state than before the call.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to bring an artifact bundle into memory.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("artifact missing: {path}")]
    ArtifactMissing { path: PathBuf },

    #[error("artifact corrupt: {path}: {details}")]
    ArtifactCorrupt { path: PathBuf, details: String },

    #[error("feature spec mismatch: {details}")]
    SpecMismatch { details: String },
}

impl LoadError {
    pub fn missing(path: impl AsRef<Path>) -> Self {
        Self::ArtifactMissing {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn corrupt(path: impl AsRef<Path>, details: impl Into<String>) -> Self {
        Self::ArtifactCorrupt {
            path: path.as_ref().to_path_buf(),
            details: details.into(),
        }
    }

    pub fn mismatch(details: impl Into<String>) -> Self {
        Self::SpecMismatch {
            details: details.into(),
        }
    }

    /// Stable machine-readable code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ArtifactMissing { .. } => "ARTIFACT_MISSING",
            Self::ArtifactCorrupt { .. } => "ARTIFACT_CORRUPT",
            Self::SpecMismatch { .. } => "SPEC_MISMATCH",
        }
    }
}

/// A record that cannot be turned into a model input vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required feature '{0}'")]
    FeatureMissing(String),

    #[error("feature '{name}' has type {got}, expected {expected}")]
    TypeMismatch {
        name: String,
        got: String,
        expected: String,
    },

    #[error("feature '{0}' is too large to scale")]
    OutOfRange(String),
}

impl ValidationError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::FeatureMissing(_) => "FEATURE_MISSING",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::OutOfRange(_) => "OUT_OF_RANGE",
        }
    }

    /// Name of the offending feature
    pub fn feature(&self) -> &str {
        match self {
            Self::FeatureMissing(name) => name,
            Self::TypeMismatch { name, .. } => name,
            Self::OutOfRange(name) => name,
        }
    }
}

/// Request-scoped engine failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unknown model '{0}', expected 'primary' or 'fallback'")]
    UnknownModel(String),

    #[error("batch of {size} records exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("threshold {0} must lie strictly between 0 and 1")]
    InvalidThreshold(f64),

    #[error("vector has {got} components, the models expect {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("{model} model produced a non-finite score")]
    NonFiniteScore { model: &'static str },
}

impl EngineError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::UnknownModel(_) => "UNKNOWN_MODEL",
            Self::BatchTooLarge { .. } => "BATCH_TOO_LARGE",
            Self::InvalidThreshold(_) => "INVALID_THRESHOLD",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::NonFiniteScore { .. } => "NON_FINITE_SCORE",
        }
    }

    /// Name of the offending feature, when the failure is tied to one
    pub fn feature(&self) -> Option<&str> {
        match self {
            Self::Validation(e) => Some(e.feature()),
            _ => None,
        }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
