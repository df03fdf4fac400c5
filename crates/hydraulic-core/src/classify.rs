//! Valve condition classifiers.
//!
//! The predictor only needs a fitted model that maps feature rows to class
//! indices. [`TreeEnsemble`] is the native gradient-boosted tree model the
//! pipeline ships with; tests substitute fixed-output doubles.

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::{Error, Result};
use crate::labels::ClassIndex;

/// Contract for fitted classifiers.
pub trait Classifier: Send + Sync {
    /// Feature columns the classifier was fitted on.
    fn n_features(&self) -> usize;

    /// Predict one class index per row of `features`.
    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Vec<ClassIndex>>;

    /// Short human readable name of the model
    fn name(&self) -> &str {
        "classifier"
    }
}

impl<T: Classifier + ?Sized> Classifier for &T {
    fn n_features(&self) -> usize {
        (**self).n_features()
    }

    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Vec<ClassIndex>> {
        (**self).predict(features)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: Classifier + ?Sized> Classifier for Box<T> {
    fn n_features(&self) -> usize {
        (**self).n_features()
    }

    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Vec<ClassIndex>> {
        (**self).predict(features)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A node of a binary decision tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `x[feature] <= threshold` goes left; NaN goes left iff `default_left`.
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
    /// Additive raw score contribution.
    Leaf(f32),
}

/// Decision tree stored as a flat node array rooted at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Validate and build a tree.
    ///
    /// Children must point strictly forward in the node array, which rules
    /// out cycles and guarantees every walk ends at a leaf.
    pub fn new(nodes: Vec<Node>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(Error::InvalidParameters("tree has no nodes".to_string()));
        }

        for (i, node) in nodes.iter().enumerate() {
            match node {
                Node::Split {
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    for child in [*left, *right] {
                        if child <= i || child >= nodes.len() {
                            return Err(Error::InvalidParameters(format!(
                                "node {} has out-of-order child {}",
                                i, child
                            )));
                        }
                    }
                    if threshold.is_nan() {
                        return Err(Error::InvalidParameters(format!(
                            "node {} has NaN threshold",
                            i
                        )));
                    }
                }
                Node::Leaf(value) => {
                    if !value.is_finite() {
                        return Err(Error::InvalidParameters(format!(
                            "leaf {} has non-finite value",
                            i
                        )));
                    }
                }
            }
        }

        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Highest feature index any split reads, if the tree has splits.
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf(_) => None,
            })
            .max()
    }

    /// Walk the tree for one feature row and return the leaf value.
    ///
    /// `row` must cover every feature the tree splits on; the ensemble
    /// checks the width before walking.
    pub(crate) fn evaluate(&self, row: ArrayView1<'_, f32>) -> f32 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = row[*feature];
                    let go_left = if x.is_nan() {
                        *default_left
                    } else {
                        x <= *threshold
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }
}

/// A boosted tree contributing to one class's raw score.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassTree {
    pub class_index: ClassIndex,
    pub tree: DecisionTree,
}

/// Multiclass gradient-boosted decision tree ensemble.
///
/// Raw score of class `c` is `base_scores[c]` plus the leaf values of every
/// tree assigned to `c`. The prediction is the arg max (lowest index wins
/// ties).
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsemble {
    n_features: usize,
    base_scores: Vec<f32>,
    trees: Vec<ClassTree>,
}

impl TreeEnsemble {
    pub fn new(n_features: usize, base_scores: Vec<f32>, trees: Vec<ClassTree>) -> Result<Self> {
        if n_features == 0 {
            return Err(Error::InvalidParameters(
                "ensemble needs at least one feature".to_string(),
            ));
        }
        if base_scores.is_empty() {
            return Err(Error::InvalidParameters(
                "ensemble needs at least one class".to_string(),
            ));
        }
        if base_scores.iter().any(|s| !s.is_finite()) {
            return Err(Error::InvalidParameters(
                "base scores must be finite".to_string(),
            ));
        }

        for (i, ct) in trees.iter().enumerate() {
            if ct.class_index >= base_scores.len() {
                return Err(Error::InvalidParameters(format!(
                    "tree {} targets class {} but ensemble has {} classes",
                    i,
                    ct.class_index,
                    base_scores.len()
                )));
            }
            if let Some(feature) = ct.tree.max_feature() {
                if feature >= n_features {
                    return Err(Error::InvalidParameters(format!(
                        "tree {} splits on feature {} but ensemble has {} features",
                        i, feature, n_features
                    )));
                }
            }
        }

        Ok(Self {
            n_features,
            base_scores,
            trees,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.base_scores.len()
    }

    pub fn base_scores(&self) -> &[f32] {
        &self.base_scores
    }

    pub fn trees(&self) -> &[ClassTree] {
        &self.trees
    }

    /// Raw per-class scores, shape (rows, n_classes).
    pub fn raw_scores(&self, features: ArrayView2<'_, f32>) -> Result<Array2<f64>> {
        if features.ncols() != self.n_features {
            return Err(Error::shape(
                "tree ensemble features",
                self.n_features,
                features.ncols(),
            ));
        }

        let mut scores = Array2::<f64>::zeros((features.nrows(), self.n_classes()));
        for (row, mut out) in features.outer_iter().zip(scores.outer_iter_mut()) {
            for (c, base) in self.base_scores.iter().enumerate() {
                out[c] = f64::from(*base);
            }
            for ct in &self.trees {
                out[ct.class_index] += f64::from(ct.tree.evaluate(row));
            }
        }
        Ok(scores)
    }
}

impl Classifier for TreeEnsemble {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Vec<ClassIndex>> {
        let scores = self.raw_scores(features)?;
        Ok(scores.outer_iter().map(argmax).collect())
    }

    fn name(&self) -> &str {
        "tree_ensemble"
    }
}

fn argmax(scores: ArrayView1<'_, f64>) -> ClassIndex {
    let mut best = 0;
    for (i, s) in scores.iter().enumerate() {
        if *s > scores[best] {
            best = i;
        }
    }
    best
}
