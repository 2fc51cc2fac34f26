//! Regressor evaluation for the supported artifact kinds.
//!
//! - `gradient_boosting`: `init + learning_rate * Σ tree(x)`
//! - `linear`: `intercept + coefficients · x`
//!
//! Trees are stored as flat node arrays with the root at index 0. Children
//! always sit after their parent, which `validate` checks once at load time so
//! that traversal is guaranteed to terminate without bounds panics.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::model::ModelError;

/// A single tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go to `left` when `x[feature] <= threshold`, else `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn predict(&self, x: &[f64]) -> f64 {
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

    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {idx} has a non-finite value"));
                    }
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {idx} splits on feature {feature} (only {n_features})"));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {idx} has a NaN threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} points to invalid child {child}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub init: f64,
    pub learning_rate: f64,
    pub trees: Vec<RegressionTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

/// The fitted regressor, tagged by `kind` in the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    GradientBoosting(GradientBoosting),
    Linear(LinearModel),
}

impl Regressor {
    pub fn kind(&self) -> &'static str {
        match self {
            Regressor::GradientBoosting(_) => "gradient_boosting",
            Regressor::Linear(_) => "linear",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Regressor::GradientBoosting(_) => "Gradient Boosting",
            Regressor::Linear(_) => "Linear Regression",
        }
    }

    pub fn n_trees(&self) -> Option<usize> {
        match self {
            Regressor::GradientBoosting(gb) => Some(gb.trees.len()),
            Regressor::Linear(_) => None,
        }
    }

    pub fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        match self {
            Regressor::GradientBoosting(gb) => {
                if !(gb.init.is_finite() && gb.learning_rate.is_finite()) {
                    return Err(ModelError::Invalid("non-finite init or learning rate".to_string()));
                }
                for (t, tree) in gb.trees.iter().enumerate() {
                    tree.validate(n_features)
                        .map_err(|e| ModelError::Invalid(format!("tree {t}: {e}")))?;
                }
            }
            Regressor::Linear(lin) => {
                if lin.coefficients.len() != n_features {
                    return Err(ModelError::Invalid(format!(
                        "linear model has {} coefficients for {n_features} features",
                        lin.coefficients.len()
                    )));
                }
                if !lin.intercept.is_finite() || lin.coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(ModelError::Invalid("non-finite linear coefficients".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Evaluate on an encoded feature vector of the validated width.
    pub fn predict(&self, x: &[f64]) -> f64 {
        match self {
            Regressor::GradientBoosting(gb) => {
                let sum: f64 = gb.trees.iter().map(|t| t.predict(x)).sum();
                gb.init + gb.learning_rate * sum
            }
            Regressor::Linear(lin) => {
                let beta = DVector::from_column_slice(&lin.coefficients);
                let x = DVector::from_column_slice(x);
                lin.intercept + beta.dot(&x)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, lo: f64, hi: f64) -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: lo },
                TreeNode::Leaf { value: hi },
            ],
        }
    }

    #[test]
    fn split_goes_left_on_equal() {
        let tree = stump(0, 1.0, -1.0, 1.0);
        assert_eq!(tree.predict(&[1.0]), -1.0);
        assert_eq!(tree.predict(&[1.0 + 1e-12]), 1.0);
    }

    #[test]
    fn boosting_sums_scaled_trees() {
        let model = Regressor::GradientBoosting(GradientBoosting {
            init: 10.0,
            learning_rate: 0.5,
            trees: vec![stump(0, 0.0, -2.0, 2.0), stump(1, 5.0, 4.0, 8.0)],
        });
        model.validate(2).unwrap();
        assert_eq!(model.predict(&[1.0, 3.0]), 10.0 + 0.5 * (2.0 + 4.0));
    }

    #[test]
    fn linear_is_a_dot_product() {
        let model = Regressor::Linear(LinearModel {
            intercept: 1.0,
            coefficients: vec![2.0, -0.5],
        });
        model.validate(2).unwrap();
        assert!((model.predict(&[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert!(model.validate(3).is_err());
    }

    #[test]
    fn validate_rejects_cycles_and_bad_features() {
        let mut tree = stump(0, 0.0, 1.0, 2.0);
        tree.nodes[0] = TreeNode::Split {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 2,
        };
        let model = Regressor::GradientBoosting(GradientBoosting {
            init: 0.0,
            learning_rate: 0.1,
            trees: vec![tree],
        });
        assert!(model.validate(1).is_err());

        let model = Regressor::GradientBoosting(GradientBoosting {
            init: 0.0,
            learning_rate: 0.1,
            trees: vec![stump(3, 0.0, 1.0, 2.0)],
        });
        assert!(model.validate(2).is_err());
    }

    #[test]
    fn artifact_nodes_deserialize_untagged() {
        let tree: RegressionTree = serde_json::from_str(
            r#"{"nodes":[{"feature":0,"threshold":0.5,"left":1,"right":2},{"value":1.5},{"value":-1.0}]}"#,
        )
        .unwrap();
        assert_eq!(tree, stump(0, 0.5, 1.5, -1.0));

        let model: Regressor =
            serde_json::from_str(r#"{"kind":"linear","intercept":0.0,"coefficients":[1.0]}"#).unwrap();
        assert_eq!(model.kind(), "linear");
    }
}
