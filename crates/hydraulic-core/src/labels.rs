//! Valve condition labels and the class index codec.
//!
//! The classifier works in a dimensionless index space; operators think in
//! valve condition percentages. The two are tied by a fixed, ordered
//! bijection:
//!
//! ```text
//! index      0    1    2    3
//! condition  73%  80%  90%  100%
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Classifier-native prediction label.
pub type ClassIndex = usize;

/// Valve condition, expressed as a percentage of optimal switching behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ValveCondition {
    CloseToTotalFailure,
    SevereLag,
    SmallLag,
    Optimal,
}

/// All conditions, ordered by class index (ascending condition).
pub const CONDITIONS: [ValveCondition; 4] = [
    ValveCondition::CloseToTotalFailure,
    ValveCondition::SevereLag,
    ValveCondition::SmallLag,
    ValveCondition::Optimal,
];

impl ValveCondition {
    /// Condition percentage (73, 80, 90 or 100).
    pub const fn percent(self) -> u8 {
        match self {
            ValveCondition::CloseToTotalFailure => 73,
            ValveCondition::SevereLag => 80,
            ValveCondition::SmallLag => 90,
            ValveCondition::Optimal => 100,
        }
    }

    /// Class index of this condition in the standard codec.
    pub const fn class_index(self) -> ClassIndex {
        match self {
            ValveCondition::CloseToTotalFailure => 0,
            ValveCondition::SevereLag => 1,
            ValveCondition::SmallLag => 2,
            ValveCondition::Optimal => 3,
        }
    }

    /// Alert level: optimal is fine, below 80% is critical, the rest warn.
    pub const fn severity(self) -> Severity {
        match self {
            ValveCondition::Optimal => Severity::Ok,
            ValveCondition::SmallLag | ValveCondition::SevereLag => Severity::Warning,
            ValveCondition::CloseToTotalFailure => Severity::Critical,
        }
    }

    /// Human readable description for presentation layers.
    pub const fn description(self) -> &'static str {
        match self {
            ValveCondition::CloseToTotalFailure => "close to total failure",
            ValveCondition::SevereLag => "severe lag",
            ValveCondition::SmallLag => "small lag",
            ValveCondition::Optimal => "optimal switching behavior",
        }
    }
}

impl From<ValveCondition> for u8 {
    fn from(condition: ValveCondition) -> Self {
        condition.percent()
    }
}

impl TryFrom<u8> for ValveCondition {
    type Error = Error;

    fn try_from(percent: u8) -> Result<Self> {
        CONDITIONS
            .iter()
            .copied()
            .find(|c| c.percent() == percent)
            .ok_or(Error::UnknownConditionLabel(percent))
    }
}

impl fmt::Display for ValveCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}% ({})", self.percent(), self.description())
    }
}

/// How urgently a valve condition needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Ok => "ok",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Fixed bijection between class indices and valve conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCodec {
    table: [ValveCondition; 4],
}

impl LabelCodec {
    /// The codec every predictor is trained against.
    pub fn standard() -> Self {
        Self { table: CONDITIONS }
    }

    /// Map a condition to its class index.
    pub fn encode(&self, condition: ValveCondition) -> ClassIndex {
        condition.class_index()
    }

    /// Map a class index to its condition.
    pub fn decode(&self, index: ClassIndex) -> Result<ValveCondition> {
        self.table
            .get(index)
            .copied()
            .ok_or(Error::UnknownClassIndex(index))
    }

    /// Decode a whole batch; any unknown index fails the batch.
    pub fn decode_batch(&self, indices: &[ClassIndex]) -> Result<Vec<ValveCondition>> {
        indices.iter().map(|&i| self.decode(i)).collect()
    }

    /// Condition percentages in class index order.
    pub fn percentages(&self) -> Vec<u8> {
        self.table.iter().map(|c| c.percent()).collect()
    }
}

impl Default for LabelCodec {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_order_is_ascending_condition() {
        let codec = LabelCodec::standard();
        assert_eq!(codec.percentages(), vec![73, 80, 90, 100]);
    }

    #[test]
    fn test_decode_encode_roundtrip() {
        let codec = LabelCodec::standard();
        for i in 0..4 {
            assert_eq!(codec.encode(codec.decode(i).unwrap()), i);
        }
        for percent in [73u8, 80, 90, 100] {
            let condition = ValveCondition::try_from(percent).unwrap();
            let back = codec.decode(codec.encode(condition)).unwrap();
            assert_eq!(back.percent(), percent);
        }
    }

    #[test]
    fn test_encode_matches_table_position() {
        let codec = LabelCodec::standard();
        for (i, condition) in CONDITIONS.iter().enumerate() {
            assert_eq!(codec.encode(*condition), i);
            assert_eq!(condition.class_index(), i);
        }
    }

    #[test]
    fn test_severity_levels() {
        let levels: Vec<Severity> = CONDITIONS.iter().map(|c| c.severity()).collect();
        assert_eq!(
            levels,
            vec![
                Severity::Critical,
                Severity::Warning,
                Severity::Warning,
                Severity::Ok
            ]
        );
        assert_eq!(Severity::Critical.to_string(), "critical");
        assert_eq!(serde_json::to_string(&Severity::Ok).unwrap(), "\"ok\"");
    }

    #[test]
    fn test_decode_unknown_index() {
        let codec = LabelCodec::standard();
        match codec.decode(4) {
            Err(Error::UnknownClassIndex(4)) => {}
            other => panic!("expected UnknownClassIndex(4), got {:?}", other),
        }
    }

    #[test]
    fn test_decode_batch_is_all_or_nothing() {
        let codec = LabelCodec::standard();
        assert!(codec.decode_batch(&[0, 3, 7, 1]).is_err());

        let decoded = codec.decode_batch(&[3, 0, 2]).unwrap();
        assert_eq!(
            decoded,
            vec![
                ValveCondition::Optimal,
                ValveCondition::CloseToTotalFailure,
                ValveCondition::SmallLag
            ]
        );
    }

    #[test]
    fn test_unknown_percentage() {
        assert!(matches!(
            ValveCondition::try_from(85),
            Err(Error::UnknownConditionLabel(85))
        ));
    }

    #[test]
    fn test_serde_as_percentage() {
        let conditions = vec![ValveCondition::Optimal, ValveCondition::SevereLag];
        let json = serde_json::to_string(&conditions).unwrap();
        assert_eq!(json, "[100,80]");

        let parsed: ValveCondition = serde_json::from_str("73").unwrap();
        assert_eq!(parsed, ValveCondition::CloseToTotalFailure);
        assert!(serde_json::from_str::<ValveCondition>("74").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ValveCondition::SmallLag.to_string(), "90% (small lag)");
    }
}
