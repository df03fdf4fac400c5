//! Dimensionality reduction for raw sensor channels.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::{Error, Result};

/// Contract for fitted dimensionality reduction transforms.
///
/// Any transform that deterministically maps rows of a fixed input width to
/// rows of a fixed output width can stand in for [`Pca`].
pub trait Reducer: Send + Sync {
    /// Column count the reducer was fitted on.
    fn input_width(&self) -> usize;

    /// Number of component scores produced per row.
    fn output_width(&self) -> usize;

    /// Project `batch` (rows = cycles) onto the fitted components.
    fn transform(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>>;

    /// Short human readable name of the reducer
    fn name(&self) -> &str {
        "reducer"
    }
}

impl<T: Reducer + ?Sized> Reducer for &T {
    fn input_width(&self) -> usize {
        (**self).input_width()
    }

    fn output_width(&self) -> usize {
        (**self).output_width()
    }

    fn transform(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        (**self).transform(batch)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: Reducer + ?Sized> Reducer for Box<T> {
    fn input_width(&self) -> usize {
        (**self).input_width()
    }

    fn output_width(&self) -> usize {
        (**self).output_width()
    }

    fn transform(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        (**self).transform(batch)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Fitted principal component analysis projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Pca {
    /// Per-feature mean removed before projection.
    mean: Array1<f32>,
    /// Principal axes, shape (n_components, input_width).
    components: Array2<f32>,
    /// Variance explained by each component; set when whitening.
    explained_variance: Option<Array1<f32>>,
}

impl Pca {
    /// Build a projection from fitted parameters.
    pub fn from_parameters(mean: Array1<f32>, components: Array2<f32>) -> Result<Self> {
        let (n_components, width) = components.dim();
        if n_components == 0 {
            return Err(Error::InvalidParameters(
                "pca needs at least one component".to_string(),
            ));
        }
        if width == 0 {
            return Err(Error::InvalidParameters(
                "pca input width must be positive".to_string(),
            ));
        }
        if mean.len() != width {
            return Err(Error::InvalidParameters(format!(
                "pca mean has {} entries but components span {} features",
                mean.len(),
                width
            )));
        }

        Ok(Self {
            mean,
            components,
            explained_variance: None,
        })
    }

    /// Scale each component score to unit variance.
    pub fn with_whitening(mut self, explained_variance: Array1<f32>) -> Result<Self> {
        if explained_variance.len() != self.n_components() {
            return Err(Error::InvalidParameters(format!(
                "whitening needs {} variances, got {}",
                self.n_components(),
                explained_variance.len()
            )));
        }
        if explained_variance.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(Error::InvalidParameters(
                "explained variance must be positive to whiten".to_string(),
            ));
        }
        self.explained_variance = Some(explained_variance);
        Ok(self)
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn mean(&self) -> &Array1<f32> {
        &self.mean
    }

    pub fn components(&self) -> &Array2<f32> {
        &self.components
    }

    pub fn explained_variance(&self) -> Option<&Array1<f32>> {
        self.explained_variance.as_ref()
    }

    pub fn is_whitened(&self) -> bool {
        self.explained_variance.is_some()
    }
}

impl Reducer for Pca {
    fn input_width(&self) -> usize {
        self.mean.len()
    }

    fn output_width(&self) -> usize {
        self.n_components()
    }

    fn transform(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        if batch.ncols() != self.input_width() {
            return Err(Error::shape("pca input", self.input_width(), batch.ncols()));
        }

        // X_pca = (X - mean) @ components^T
        let centered = &batch - &self.mean.view().insert_axis(Axis(0));
        let mut scores = centered.dot(&self.components.t());

        if let Some(variance) = &self.explained_variance {
            let scale = variance.mapv(f32::sqrt);
            scores /= &scale.view().insert_axis(Axis(0));
        }

        Ok(scores)
    }

    fn name(&self) -> &str {
        "pca"
    }
}
