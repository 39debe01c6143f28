//! Prediction result types.
//!
//! Represents the output of the health risk classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Categorical health risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Vitals within normal ranges
    Low,
    /// Monitoring recommended
    Medium,
    /// Medical attention recommended
    High,
    /// Classifier produced a class id outside the known mapping
    Unknown,
}

impl RiskLevel {
    /// Classes in the order the model's class ids and probability columns use.
    pub const CLASSES: [RiskLevel; 3] = [Self::Low, Self::Medium, Self::High];

    /// Map a predicted class id; unmapped ids degrade to `Unknown`.
    #[must_use]
    pub fn from_class_id(id: i64) -> Self {
        match id {
            0 => Self::Low,
            1 => Self::Medium,
            2 => Self::High,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-class probabilities keyed by class name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Medium")]
    pub medium: f64,
    #[serde(rename = "High")]
    pub high: f64,
}

impl ClassProbabilities {
    #[must_use]
    pub fn new(low: f64, medium: f64, high: f64) -> Self {
        Self { low, medium, high }
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.low.max(self.medium).max(self.high)
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.low + self.medium + self.high
    }
}

/// Complete prediction returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub risk_level: RiskLevel,

    /// Highest class probability (0.0 to 1.0)
    pub confidence: f64,

    /// Human-readable flags, in fixed rule order
    pub risk_factors: Vec<String>,

    pub explanation: String,

    pub probabilities: ClassProbabilities,

    /// Set when the result is assembled
    pub timestamp: DateTime<Utc>,
}

/// Liveness report for the loaded model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub model_version: String,
    pub model_type: String,
    pub feature_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_id_mapping() {
        assert_eq!(RiskLevel::from_class_id(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_class_id(1), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_class_id(2), RiskLevel::High);
        assert_eq!(RiskLevel::from_class_id(3), RiskLevel::Unknown);
        assert_eq!(RiskLevel::from_class_id(-1), RiskLevel::Unknown);
    }

    #[test]
    fn test_probabilities_serialize_with_class_names() {
        let p = ClassProbabilities::new(0.2, 0.3, 0.5);
        let json = serde_json::to_value(p).expect("Should serialize");
        assert_eq!(json["Low"], 0.2);
        assert_eq!(json["Medium"], 0.3);
        assert_eq!(json["High"], 0.5);
        assert!((p.max() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_risk_level_serializes_as_label() {
        let json = serde_json::to_value(RiskLevel::Unknown).expect("Should serialize");
        assert_eq!(json, "Unknown");
        assert_eq!(RiskLevel::Medium.to_string(), "Medium");
    }
}
