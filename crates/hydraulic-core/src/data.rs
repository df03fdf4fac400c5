//! Sensor data files.
//!
//! Each channel is stored as a header-less, tab-separated text matrix with
//! one operating cycle per line (`FS1.txt` holds 600 flow samples per line,
//! `PS2.txt` 6000 pressure samples). Line `i` of both files is cycle `i`.

use std::path::Path;

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::channel::Channel;
use crate::error::{Error, Result};

/// File names of the two channel matrices inside a data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorFiles {
    pub low_rate: String,
    pub high_rate: String,
}

impl Default for SensorFiles {
    fn default() -> Self {
        Self {
            low_rate: "FS1.txt".to_string(),
            high_rate: "PS2.txt".to_string(),
        }
    }
}

/// Read one channel matrix, enforcing the channel's nominal width.
pub fn load_channel(path: &Path, channel: Channel) -> Result<Array2<f32>> {
    let width = channel.nominal_width();
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut values = Vec::new();
    let mut rows = 0;

    for (row_num, result) in rdr.records().enumerate() {
        let record = result?;
        if record.len() != width {
            return Err(Error::shape(
                format!("{} row {} in {}", channel, row_num, path.display()),
                width,
                record.len(),
            ));
        }

        for (col, cell) in record.iter().enumerate() {
            let value = cell.trim().parse::<f32>().map_err(|e| {
                Error::Data(format!(
                    "{} row {} column {}: '{}': {}",
                    path.display(),
                    row_num,
                    col,
                    cell,
                    e
                ))
            })?;
            values.push(value);
        }
        rows += 1;
    }

    let matrix = Array2::from_shape_vec((rows, width), values)
        .map_err(|e| Error::Data(format!("{}: {}", path.display(), e)))?;

    info!(
        "Loaded {} cycles of {} from {}",
        rows,
        channel.sensor(),
        path.display()
    );
    Ok(matrix)
}

/// Both channels for the same set of cycles.
#[derive(Debug, Clone)]
pub struct SensorData {
    pub low_rate: Array2<f32>,
    pub high_rate: Array2<f32>,
}

impl SensorData {
    /// Pair two channel matrices; both must cover the same cycles.
    pub fn new(low_rate: Array2<f32>, high_rate: Array2<f32>) -> Result<Self> {
        if low_rate.nrows() != high_rate.nrows() {
            return Err(Error::Alignment(format!(
                "low-rate data has {} cycles, high-rate data has {}",
                low_rate.nrows(),
                high_rate.nrows()
            )));
        }
        Ok(Self {
            low_rate,
            high_rate,
        })
    }

    /// Load both channel files from `dir`.
    pub fn load(dir: &Path, files: &SensorFiles) -> Result<Self> {
        let low_rate = load_channel(&dir.join(&files.low_rate), Channel::LowRate)?;
        let high_rate = load_channel(&dir.join(&files.high_rate), Channel::HighRate)?;
        Self::new(low_rate, high_rate)
    }

    pub fn cycles(&self) -> usize {
        self.low_rate.nrows()
    }

    /// Single-cycle batch views for cycle `index`.
    pub fn cycle(&self, index: usize) -> Result<(ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        if index >= self.cycles() {
            return Err(Error::Data(format!(
                "cycle {} out of range, data has {} cycles",
                index,
                self.cycles()
            )));
        }
        Ok((
            self.low_rate.slice_axis(Axis(0), (index..index + 1).into()),
            self.high_rate.slice_axis(Axis(0), (index..index + 1).into()),
        ))
    }
}
