//! Scoring: validation, classifiers, risk banding and batch execution

mod engine;
mod features;
mod inference;
mod output;

pub use engine::{PredictionEngine, Scored};
pub use features::{coerce, FeatureNormalizer};
pub use inference::{
    DecisionTree, LogisticRegression, RandomForest, RandomForestArtifact, TreeNode,
};
pub use output::{build_result, classify, HIGH_RISK_FLOOR, MEDIUM_RISK_FLOOR};

/// A trained binary classifier over a normalized feature vector
pub trait Classifier: Send + Sync {
    /// Probability of theft in [0, 1]
    fn score(&self, vector: &[f64]) -> f64;

    /// Input dimensionality the model was fit on
    fn n_features(&self) -> usize;

    /// Name of the underlying estimator
    fn model_type(&self) -> &'static str;
}
