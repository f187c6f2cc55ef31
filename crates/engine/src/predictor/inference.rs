//! Classifier implementations
//!
//! The primary model is a random forest whose probability is the mean of the
//! per-tree leaf probabilities. The fallback model is a logistic regression.
//! Both are deserialized from the JSON documents the training job exports and
//! validated once, so scoring never indexes outside a tree.

use super::Classifier;
use serde::{Deserialize, Serialize};

/// One node of an exported decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go to `left` when `x[feature] <= threshold`, otherwise `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Fraction of theft samples that reached this leaf
    Leaf { value: f64 },
}

/// A single decision tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(format!(
                            "node {} splits on feature {} but the model has {} features",
                            idx, feature, n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", idx));
                    }
                    // Children must point forward so every walk terminates
                    for child in [left, right] {
                        if child <= idx || child >= len {
                            return Err(format!(
                                "node {} has child {} outside ({}, {})",
                                idx, child, idx, len
                            ));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !(0.0..=1.0).contains(&value) {
                        return Err(format!("leaf {} has probability {} outside [0, 1]", idx, value));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_value(&self, vector: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if vector[feature] <= threshold { left } else { right };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }
}

/// Wire form of `random_forest.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestArtifact {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

/// Primary classifier: an averaged ensemble of decision trees
#[derive(Debug, Clone)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(n_features: usize, trees: Vec<DecisionTree>) -> Result<Self, String> {
        if trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(n_features)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(Self { n_features, trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl TryFrom<RandomForestArtifact> for RandomForest {
    type Error = String;

    fn try_from(artifact: RandomForestArtifact) -> Result<Self, Self::Error> {
        Self::new(artifact.n_features, artifact.trees)
    }
}

impl Classifier for RandomForest {
    fn score(&self, vector: &[f64]) -> f64 {
        debug_assert_eq!(vector.len(), self.n_features);
        let sum: f64 = self.trees.iter().map(|t| t.leaf_value(vector)).sum();
        sum / self.trees.len() as f64
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn model_type(&self) -> &'static str {
        "RandomForestClassifier"
    }
}

/// Fallback classifier: `sigmoid(w · x + b)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, String> {
        let model = Self {
            coefficients,
            intercept,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.coefficients.is_empty() {
            return Err("model has no coefficients".to_string());
        }
        if let Some(i) = self.coefficients.iter().position(|c| !c.is_finite()) {
            return Err(format!("coefficient {} is not finite", i));
        }
        if !self.intercept.is_finite() {
            return Err("intercept is not finite".to_string());
        }
        Ok(())
    }
}

impl Classifier for LogisticRegression {
    fn score(&self, vector: &[f64]) -> f64 {
        debug_assert_eq!(vector.len(), self.coefficients.len());
        let z: f64 = self
            .coefficients
            .iter()
            .zip(vector)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;
        sigmoid(z)
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn model_type(&self) -> &'static str {
        "LogisticRegression"
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
