//! Sensor channels sampled per operating cycle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two sensor channels the predictor consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Volume flow sensor FS1, 10 Hz
    LowRate,
    /// Pressure sensor PS2, 100 Hz
    HighRate,
}

impl Channel {
    pub const fn sensor(self) -> &'static str {
        match self {
            Channel::LowRate => "FS1",
            Channel::HighRate => "PS2",
        }
    }

    pub const fn sampling_rate_hz(self) -> u32 {
        match self {
            Channel::LowRate => 10,
            Channel::HighRate => 100,
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Channel::LowRate => "l/min",
            Channel::HighRate => "bar",
        }
    }

    /// Samples per 60 s cycle.
    pub const fn nominal_width(self) -> usize {
        60 * self.sampling_rate_hz() as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::LowRate => write!(f, "low-rate channel ({})", self.sensor()),
            Channel::HighRate => write!(f, "high-rate channel ({})", self.sensor()),
        }
    }
}
