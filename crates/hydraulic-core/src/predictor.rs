//! End-to-end valve condition inference.
//!
//! ```text
//! low-rate batch  ─► reducer ─┐
//!                             ├─► features ─► classifier ─► indices ─► conditions
//! high-rate batch ─► reducer ─┘
//! ```

use ndarray::ArrayView2;
use serde::Serialize;
use tracing::debug;

use crate::channel::Channel;
use crate::classify::{Classifier, TreeEnsemble};
use crate::error::{Error, Result};
use crate::labels::{LabelCodec, ValveCondition};
use crate::preprocess::Preprocessor;
use crate::reduce::{Pca, Reducer};

/// Fitted inference pipeline.
///
/// Immutable once built: `predict` takes `&self`, so a single predictor can
/// serve concurrent callers on any number of threads.
#[derive(Debug, Clone)]
pub struct Predictor<C = TreeEnsemble, R = Pca> {
    classifier: C,
    low_rate: R,
    high_rate: R,
    codec: LabelCodec,
}

/// Shape summary of one channel's reducer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSummary {
    pub channel: Channel,
    pub sensor: &'static str,
    pub reducer: String,
    pub input_width: usize,
    pub components: usize,
}

/// Serializable description of a predictor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub low_rate: ChannelSummary,
    pub high_rate: ChannelSummary,
    pub classifier: String,
    pub n_features: usize,
    pub condition_labels: Vec<u8>,
}

impl<C: Classifier, R: Reducer> Predictor<C, R> {
    /// Assemble a predictor from fitted parts.
    ///
    /// The classifier must have been fitted on exactly the features the two
    /// reducers produce.
    pub fn new(classifier: C, low_rate: R, high_rate: R) -> Result<Self> {
        let feature_width = low_rate.output_width() + high_rate.output_width();
        if classifier.n_features() != feature_width {
            return Err(Error::Alignment(format!(
                "classifier expects {} features, reducers produce {} + {}",
                classifier.n_features(),
                low_rate.output_width(),
                high_rate.output_width()
            )));
        }

        Ok(Self {
            classifier,
            low_rate,
            high_rate,
            codec: LabelCodec::standard(),
        })
    }

    /// Predict the valve condition of every cycle in the batch.
    ///
    /// Row `i` of both inputs is cycle `i`; entry `i` of the output is its
    /// condition. A single bad row fails the whole batch.
    pub fn predict<A>(
        &self,
        low_rate: ArrayView2<'_, A>,
        high_rate: ArrayView2<'_, A>,
    ) -> Result<Vec<ValveCondition>>
    where
        A: Copy + Into<f64>,
    {
        let features = self.preprocessor().features(low_rate, high_rate)?;
        let indices = self.classifier.predict(features.view())?;

        if indices.len() != features.nrows() {
            return Err(Error::Alignment(format!(
                "classifier returned {} predictions for {} cycles",
                indices.len(),
                features.nrows()
            )));
        }

        let conditions = self.codec.decode_batch(&indices)?;
        debug!("Predicted valve conditions for {} cycles", conditions.len());
        Ok(conditions)
    }

    /// Same as [`predict`](Self::predict), returning condition percentages.
    pub fn predict_percentages<A>(
        &self,
        low_rate: ArrayView2<'_, A>,
        high_rate: ArrayView2<'_, A>,
    ) -> Result<Vec<u8>>
    where
        A: Copy + Into<f64>,
    {
        Ok(self
            .predict(low_rate, high_rate)?
            .into_iter()
            .map(ValveCondition::percent)
            .collect())
    }

    pub fn preprocessor(&self) -> Preprocessor<'_, R> {
        Preprocessor::new(&self.low_rate, &self.high_rate)
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            low_rate: channel_summary(Channel::LowRate, &self.low_rate),
            high_rate: channel_summary(Channel::HighRate, &self.high_rate),
            classifier: self.classifier.name().to_string(),
            n_features: self.classifier.n_features(),
            condition_labels: self.codec.percentages(),
        }
    }
}

impl<C, R> Predictor<C, R> {
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn low_rate_reducer(&self) -> &R {
        &self.low_rate
    }

    pub fn high_rate_reducer(&self) -> &R {
        &self.high_rate
    }

    pub fn codec(&self) -> &LabelCodec {
        &self.codec
    }
}

fn channel_summary<R: Reducer>(channel: Channel, reducer: &R) -> ChannelSummary {
    ChannelSummary {
        channel,
        sensor: channel.sensor(),
        reducer: reducer.name().to_string(),
        input_width: reducer.input_width(),
        components: reducer.output_width(),
    }
}
