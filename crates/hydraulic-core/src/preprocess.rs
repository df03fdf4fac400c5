//! Feature preprocessing: per-channel reduction and concatenation.
//!
//! Feature column order is fixed: low-rate component scores first, then
//! high-rate scores. Swapping them yields wrong predictions without any
//! error, so only [`combine`] builds feature matrices.

use ndarray::{concatenate, Array2, ArrayView2, Axis};

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::reduce::Reducer;

/// Project one channel's raw batch through its fitted reducer.
///
/// Values are cast to `f32` before projection so results do not depend on
/// the caller's numeric type.
pub fn reduce<A, R>(channel: Channel, data: ArrayView2<'_, A>, reducer: &R) -> Result<Array2<f32>>
where
    A: Copy + Into<f64>,
    R: Reducer + ?Sized,
{
    if data.ncols() != reducer.input_width() {
        return Err(Error::shape(
            channel.to_string(),
            reducer.input_width(),
            data.ncols(),
        ));
    }

    let data = data.mapv(|v| Into::<f64>::into(v) as f32);
    let projected = reducer.transform(data.view())?;

    if projected.dim() != (data.nrows(), reducer.output_width()) {
        return Err(Error::Alignment(format!(
            "{} reducer returned shape {:?}, expected ({}, {})",
            channel,
            projected.dim(),
            data.nrows(),
            reducer.output_width()
        )));
    }

    Ok(projected)
}

/// Concatenate reduced channels into a feature matrix, low-rate first.
pub fn combine<'a>(low: ArrayView2<'a, f32>, high: ArrayView2<'a, f32>) -> Result<Array2<f32>> {
    if low.nrows() != high.nrows() {
        return Err(Error::Alignment(format!(
            "low-rate features have {} rows, high-rate features have {}",
            low.nrows(),
            high.nrows()
        )));
    }

    concatenate(Axis(1), &[low, high]).map_err(|e| Error::Alignment(e.to_string()))
}

/// Borrowed view of the two fitted reducers.
pub struct Preprocessor<'a, R: ?Sized> {
    low_rate: &'a R,
    high_rate: &'a R,
}

impl<'a, R: Reducer + ?Sized> Preprocessor<'a, R> {
    pub fn new(low_rate: &'a R, high_rate: &'a R) -> Self {
        Self {
            low_rate,
            high_rate,
        }
    }

    /// Width of the feature matrix this preprocessor produces.
    pub fn feature_width(&self) -> usize {
        self.low_rate.output_width() + self.high_rate.output_width()
    }

    /// Build the feature matrix for a batch of cycles.
    pub fn features<A>(
        &self,
        low: ArrayView2<'_, A>,
        high: ArrayView2<'_, A>,
    ) -> Result<Array2<f32>>
    where
        A: Copy + Into<f64>,
    {
        if low.nrows() != high.nrows() {
            return Err(Error::Alignment(format!(
                "low-rate batch has {} cycles, high-rate batch has {}",
                low.nrows(),
                high.nrows()
            )));
        }

        let low = reduce(Channel::LowRate, low, self.low_rate)?;
        let high = reduce(Channel::HighRate, high, self.high_rate)?;
        combine(low.view(), high.view())
    }
}
