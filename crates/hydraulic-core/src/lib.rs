//! # Hydraulic Valve Condition Core
//!
//! Predicts the wear level of a hydraulic valve from one operating cycle of
//! two sensors: volume flow FS1 (low-rate, 600 samples) and pressure PS2
//! (high-rate, 6000 samples).
//!
//! - **reduce**: fitted dimensionality reduction per channel ([`Pca`])
//! - **classify**: fitted classifier over the reduced features ([`TreeEnsemble`])
//! - **preprocess**: channel reduction and feature concatenation
//! - **predictor**: end-to-end inference to [`ValveCondition`]s
//! - **persist**: versioned, checksummed model artifacts
//! - **data**: tab-separated sensor matrix loading
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hydraulic_core::{persist, Predictor, SensorData, SensorFiles};
//!
//! let predictor: Predictor = persist::load_from_path("model.bin")?;
//! let data = SensorData::load("data_subset".as_ref(), &SensorFiles::default())?;
//! let conditions = predictor.predict(data.low_rate.view(), data.high_rate.view())?;
//! ```

pub mod channel;
pub mod classify;
pub mod data;
pub mod error;
pub mod labels;
pub mod persist;
pub mod predictor;
pub mod preprocess;
pub mod reduce;
pub mod tracing;

// Re-export main types at crate root
pub use channel::Channel;
pub use classify::{ClassTree, Classifier, DecisionTree, Node, TreeEnsemble};
pub use data::{SensorData, SensorFiles};
pub use error::{Error, Result};
pub use labels::{ClassIndex, LabelCodec, Severity, ValveCondition, CONDITIONS};
pub use persist::Persist;
pub use predictor::{ChannelSummary, PipelineSummary, Predictor};
pub use preprocess::Preprocessor;
pub use reduce::{Pca, Reducer};
