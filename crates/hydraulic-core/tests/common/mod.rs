//! Shared fixtures for integration tests

#![allow(dead_code)]

use hydraulic_core::{
    ClassIndex, ClassTree, Classifier, DecisionTree, Node, Pca, Predictor, Result, TreeEnsemble,
};
use ndarray::{Array1, Array2, ArrayView2};

pub const LOW_WIDTH: usize = 600;
pub const HIGH_WIDTH: usize = 6000;

/// Classifier double returning `default` for every row except `overrides`.
pub struct FixedClassifier {
    pub n_features: usize,
    pub default: ClassIndex,
    pub overrides: Vec<(usize, ClassIndex)>,
}

impl FixedClassifier {
    pub fn constant(n_features: usize, index: ClassIndex) -> Self {
        Self {
            n_features,
            default: index,
            overrides: Vec::new(),
        }
    }
}

impl Classifier for FixedClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Vec<ClassIndex>> {
        Ok((0..features.nrows())
            .map(|row| {
                self.overrides
                    .iter()
                    .find(|(r, _)| *r == row)
                    .map(|(_, index)| *index)
                    .unwrap_or(self.default)
            })
            .collect())
    }
}

/// Classifier double that drops the last prediction.
pub struct ShortClassifier {
    pub n_features: usize,
}

impl Classifier for ShortClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Vec<ClassIndex>> {
        Ok(vec![0; features.nrows().saturating_sub(1)])
    }
}

/// PCA with a row-mean component and a first-sample component.
pub fn mean_and_first_pca(width: usize) -> Pca {
    let mut components = Array2::zeros((2, width));
    components.row_mut(0).fill(1.0 / width as f32);
    components[[1, 0]] = 1.0;
    Pca::from_parameters(Array1::zeros(width), components).unwrap()
}

fn stump(feature: usize, threshold: f32, left: f32, right: f32) -> DecisionTree {
    DecisionTree::new(vec![
        Node::Split {
            feature,
            threshold,
            left: 1,
            right: 2,
            default_left: true,
        },
        Node::Leaf(left),
        Node::Leaf(right),
    ])
    .unwrap()
}

/// Tree ensemble over (low mean, low first, high mean, high first).
///
/// The low-rate mean selects the class: <= 0.25 -> 0, <= 0.5 -> 1,
/// <= 0.75 -> 2, above -> 3. A high-rate mean above 100 forces class 0.
pub fn banded_ensemble() -> TreeEnsemble {
    TreeEnsemble::new(
        4,
        vec![0.5, 0.0, 0.0, 0.0],
        vec![
            ClassTree {
                class_index: 1,
                tree: stump(0, 0.25, 0.0, 1.0),
            },
            ClassTree {
                class_index: 2,
                tree: stump(0, 0.5, 0.0, 2.0),
            },
            ClassTree {
                class_index: 3,
                tree: stump(0, 0.75, 0.0, 3.0),
            },
            ClassTree {
                class_index: 0,
                tree: stump(2, 100.0, 0.0, 10.0),
            },
        ],
    )
    .unwrap()
}

pub fn fixture_predictor() -> Predictor {
    Predictor::new(
        banded_ensemble(),
        mean_and_first_pca(LOW_WIDTH),
        mean_and_first_pca(HIGH_WIDTH),
    )
    .unwrap()
}

/// Batch whose row `i` is filled with `levels[i]`.
pub fn leveled(levels: &[f32], width: usize) -> Array2<f32> {
    let mut batch = Array2::zeros((levels.len(), width));
    for (mut row, level) in batch.outer_iter_mut().zip(levels) {
        row.fill(*level);
    }
    batch
}

/// Deterministic pseudo-random batch in [0, 1).
pub fn noise(rows: usize, width: usize, seed: u64) -> Array2<f32> {
    let mut state = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    Array2::from_shape_fn((rows, width), |_| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 40) as f32 / (1u64 << 24) as f32
    })
}
