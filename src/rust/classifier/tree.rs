//! Multiclass gradient-boosted tree ensemble stored as JSON.
//!
//! Each tree contributes its leaf value to the raw score of one class. The
//! predicted class is the arg-max of the raw scores, probabilities are their
//! softmax. Splits are either numeric (`value <= threshold` goes left) or
//! categorical (membership of the cell's string form goes left).

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::model::CategoryModel;
use crate::features::{FeatureRow, FeatureValue, COLUMNS};

/// A decision tree node (internal or leaf)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Node {
    Leaf {
        leaf: f64,
    },
    Categorical {
        feature: usize,
        categories: Vec<String>,
        left: usize,
        right: usize,
    },
    Numeric {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single decision tree voting for one class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub class: usize,
    /// Nodes with the root first; children always come after their parent
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeEnsemble {
    pub feature_names: Vec<String>,
    pub n_classes: usize,
    /// Per-class intercept; empty means all zero
    #[serde(default)]
    pub base_scores: Vec<f64>,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    pub trees: Vec<Tree>,
}

fn default_learning_rate() -> f64 {
    1.0
}

impl TreeEnsemble {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| ClassifierError::ValidationError(format!("Failed to read model: {}", e)))?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ClassifierError> {
        let model: Self = serde_json::from_slice(bytes)
            .map_err(|e| ClassifierError::ValidationError(format!("Failed to parse model: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    /// Checks that the ensemble matches the feature row schema and that every
    /// tree terminates.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let invalid = |msg: String| Err(ClassifierError::ValidationError(msg));

        if self.feature_names.iter().map(String::as_str).ne(COLUMNS.iter().copied()) {
            return invalid(format!(
                "Model features {:?} do not match the expected columns {:?}",
                self.feature_names, COLUMNS
            ));
        }
        if self.n_classes == 0 {
            return invalid("Model must have at least one class".into());
        }
        if !self.base_scores.is_empty() && self.base_scores.len() != self.n_classes {
            return invalid(format!(
                "Expected {} base scores, found {}",
                self.n_classes,
                self.base_scores.len()
            ));
        }
        if !self.learning_rate.is_finite() || self.base_scores.iter().any(|s| !s.is_finite()) {
            return invalid("Learning rate and base scores must be finite".into());
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.class >= self.n_classes {
                return invalid(format!("Tree {} votes for unknown class {}", t, tree.class));
            }
            if tree.nodes.is_empty() {
                return invalid(format!("Tree {} has no nodes", t));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Leaf { leaf } if !leaf.is_finite() => {
                        return invalid(format!("Tree {} node {} has a non-finite leaf", t, i));
                    }
                    Node::Leaf { .. } => {}
                    Node::Numeric { feature, left, right, threshold } => {
                        if threshold.is_nan() {
                            return invalid(format!("Tree {} node {} has a NaN threshold", t, i));
                        }
                        self.check_split(t, i, *feature, *left, *right, tree.nodes.len())?;
                    }
                    Node::Categorical { feature, left, right, .. } => {
                        self.check_split(t, i, *feature, *left, *right, tree.nodes.len())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn check_split(
        &self,
        tree: usize,
        node: usize,
        feature: usize,
        left: usize,
        right: usize,
        len: usize,
    ) -> Result<(), ClassifierError> {
        if feature >= self.feature_names.len() {
            return Err(ClassifierError::ValidationError(format!(
                "Tree {} node {} splits on unknown feature {}",
                tree, node, feature
            )));
        }
        for child in [left, right] {
            if child <= node || child >= len {
                return Err(ClassifierError::ValidationError(format!(
                    "Tree {} node {} has invalid child {}",
                    tree, node, child
                )));
            }
        }
        Ok(())
    }

    /// Raw (pre-softmax) score for every class.
    pub fn raw_scores(&self, row: &FeatureRow) -> Result<Vec<f64>, ClassifierError> {
        let mut scores = if self.base_scores.is_empty() {
            vec![0.0; self.n_classes]
        } else {
            self.base_scores.clone()
        };
        for tree in &self.trees {
            scores[tree.class] += self.learning_rate * eval_tree(tree, row)?;
        }
        Ok(scores)
    }
}

fn eval_tree(tree: &Tree, row: &FeatureRow) -> Result<f64, ClassifierError> {
    let values = row.values();
    let mut idx = 0usize;
    loop {
        let node = tree
            .nodes
            .get(idx)
            .ok_or_else(|| ClassifierError::ModelError(format!("Node {} out of bounds", idx)))?;
        idx = match node {
            Node::Leaf { leaf } => return Ok(*leaf),
            Node::Numeric { feature, threshold, left, right } => {
                let cell = cell(values, *feature)?;
                let value = cell.as_f64().ok_or_else(|| {
                    ClassifierError::ModelError(format!(
                        "Column {} holds a non-numeric {} value {:?}",
                        COLUMNS[*feature],
                        cell.type_name(),
                        cell.to_string()
                    ))
                })?;
                if value <= *threshold { *left } else { *right }
            }
            Node::Categorical { feature, categories, left, right } => {
                let level = cell(values, *feature)?.to_string();
                if categories.iter().any(|c| *c == level) { *left } else { *right }
            }
        };
    }
}

fn cell(values: &[FeatureValue], feature: usize) -> Result<&FeatureValue, ClassifierError> {
    values
        .get(feature)
        .ok_or_else(|| ClassifierError::ModelError(format!("Row has no feature {}", feature)))
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl CategoryModel for TreeEnsemble {
    fn n_classes(&self) -> Option<usize> {
        Some(self.n_classes)
    }

    fn predict(&self, row: &FeatureRow) -> Result<usize, ClassifierError> {
        let scores = self.raw_scores(row)?;
        let mut best = 0;
        for (i, score) in scores.iter().enumerate() {
            if *score > scores[best] {
                best = i;
            }
        }
        Ok(best)
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<Option<Vec<f64>>, ClassifierError> {
        Ok(Some(softmax(&self.raw_scores(row)?)))
    }

    fn kind(&self) -> &'static str {
        "tree-ensemble"
    }
}
