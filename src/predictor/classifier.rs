//! Binary classifier capability and the on-disk model artifact.
//!
//! The artifact is a JSON document produced by the training pipeline:
//!
//! ```json
//! {
//!   "name": "atp-logreg-v1",
//!   "feature_names": ["diff_rank", "diff_pts", "Surface_Clay", "Surface_Grass", "Surface_Hard"],
//!   "kind": "logistic",
//!   "coefficients": [-0.021, 0.00011, 0.0, 0.0, 0.0],
//!   "intercept": 0.0
//! }
//! ```
//!
//! `kind` may also be `"random_forest"` with a list of trees whose nodes use
//! the `x[feature] <= threshold` goes-left convention.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::features::{EncodedFeatureVector, FEATURE_COLUMNS, FEATURE_COUNT};

/// Anything that can score an encoded match.
///
/// Implementations must be free of side effects: one instance is shared by
/// every request.
pub trait Classifier: Send + Sync {
    /// Predicted class: 1 = Player 1 wins, 0 = Player 2 wins.
    fn predict_class(&self, x: &EncodedFeatureVector) -> u8;

    /// Probability of class 1 (Player 1 wins), in [0, 1].
    fn predict_probability(&self, x: &EncodedFeatureVector) -> f64;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("feature schema mismatch: model expects {found:?}, encoder produces {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("invalid model: {0}")]
    Invalid(String),
}

// ── Artifact format ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct ModelArtifact {
    name: Option<String>,
    feature_names: Vec<String>,
    #[serde(flatten)]
    estimator: Estimator,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Estimator {
    Logistic {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    RandomForest {
        trees: Vec<Tree>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Class weights `[class 0, class 1]`
        value: [f64; 2],
    },
}

/// Load a classifier from a JSON artifact on disk.
pub fn load_model(path: impl AsRef<Path>) -> Result<Box<dyn Classifier>, ModelLoadError> {
    let raw = std::fs::read_to_string(path)?;
    parse_model(&raw)
}

/// Parse and validate a JSON artifact.
pub fn parse_model(raw: &str) -> Result<Box<dyn Classifier>, ModelLoadError> {
    let artifact: ModelArtifact = serde_json::from_str(raw)?;

    if artifact.feature_names.iter().map(String::as_str).ne(FEATURE_COLUMNS) {
        return Err(ModelLoadError::SchemaMismatch {
            expected: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            found: artifact.feature_names,
        });
    }

    match artifact.estimator {
        Estimator::Logistic {
            coefficients,
            intercept,
        } => {
            let name = artifact.name.unwrap_or_else(|| "logistic".to_string());
            let model = LogisticModel::new(name, &coefficients, intercept)?;
            Ok(Box::new(model))
        }
        Estimator::RandomForest { trees } => {
            let name = artifact.name.unwrap_or_else(|| "random_forest".to_string());
            Ok(Box::new(RandomForest::new(name, trees)?))
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

// ── Logistic regression ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LogisticModel {
    name: String,
    coefficients: [f64; FEATURE_COUNT],
    intercept: f64,
}

impl LogisticModel {
    pub fn new(name: String, coefficients: &[f64], intercept: f64) -> Result<Self, ModelLoadError> {
        let coefficients: [f64; FEATURE_COUNT] = coefficients.try_into().map_err(|_| {
            ModelLoadError::Invalid(format!(
                "expected {} coefficients, got {}",
                FEATURE_COUNT,
                coefficients.len()
            ))
        })?;
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelLoadError::Invalid("non-finite coefficient".into()));
        }
        Ok(LogisticModel {
            name,
            coefficients,
            intercept,
        })
    }

    fn decision_function(&self, x: &EncodedFeatureVector) -> f64 {
        let x = x.to_array();
        self.coefficients
            .iter()
            .zip(x.iter())
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept
    }
}

impl Classifier for LogisticModel {
    fn predict_class(&self, x: &EncodedFeatureVector) -> u8 {
        u8::from(self.decision_function(x) > 0.0)
    }

    fn predict_probability(&self, x: &EncodedFeatureVector) -> f64 {
        sigmoid(self.decision_function(x))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ── Random forest ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RandomForest {
    name: String,
    trees: Vec<Tree>,
}

impl RandomForest {
    pub fn new(name: String, trees: Vec<Tree>) -> Result<Self, ModelLoadError> {
        if trees.is_empty() {
            return Err(ModelLoadError::Invalid("forest has no trees".into()));
        }
        for (t, tree) in trees.iter().enumerate() {
            validate_tree(tree).map_err(|e| ModelLoadError::Invalid(format!("tree {}: {}", t, e)))?;
        }
        Ok(RandomForest { name, trees })
    }

    /// Mean of the per-tree class distributions, `[p0, p1]`.
    fn class_distribution(&self, x: &EncodedFeatureVector) -> [f64; 2] {
        let x = x.to_array();
        let mut total = [0.0, 0.0];
        for tree in &self.trees {
            let [w0, w1] = tree.leaf_value(&x);
            let sum = w0 + w1;
            if sum > 0.0 {
                total[0] += w0 / sum;
                total[1] += w1 / sum;
            }
        }
        let n = self.trees.len() as f64;
        [total[0] / n, total[1] / n]
    }
}

impl Tree {
    /// Walk from the root to a leaf. Validation guarantees children point
    /// forward, so the walk always terminates.
    fn leaf_value(&self, x: &[f64; FEATURE_COUNT]) -> [f64; 2] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

fn validate_tree(tree: &Tree) -> Result<(), String> {
    if tree.nodes.is_empty() {
        return Err("no nodes".into());
    }
    for (i, node) in tree.nodes.iter().enumerate() {
        match node {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= FEATURE_COUNT {
                    return Err(format!("node {} splits on unknown feature {}", i, feature));
                }
                if threshold.is_nan() {
                    return Err(format!("node {} has a NaN threshold", i));
                }
                for child in [*left, *right] {
                    if child <= i || child >= tree.nodes.len() {
                        return Err(format!("node {} has invalid child {}", i, child));
                    }
                }
            }
            TreeNode::Leaf { value } => {
                if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(format!("node {} has invalid class weights", i));
                }
            }
        }
    }
    Ok(())
}

impl Classifier for RandomForest {
    fn predict_class(&self, x: &EncodedFeatureVector) -> u8 {
        let [p0, p1] = self.class_distribution(x);
        u8::from(p1 > p0)
    }

    fn predict_probability(&self, x: &EncodedFeatureVector) -> f64 {
        self.class_distribution(x)[1]
    }

    fn name(&self) -> &str {
        &self.name
    }
}
