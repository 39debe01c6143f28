//! Risk explanation: threshold flags and narrative text.
//!
//! Operates on the unscaled feature map. Both operations are pure: the same
//! inputs always give the same output.

use crate::domain::{FeatureMap, RiskLevel, VitalField};

/// A discrete clinical flag raised by one threshold rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskFactor {
    Tachycardia,
    Bradycardia,
    HighSystolic,
    HighDiastolic,
    ElevatedGlucose,
    LowGlucose,
    InsufficientSleep,
    ExcessiveSleep,
    Fever,
    LowTemperature,
    LowOxygen,
    AdvancedAge,
}

impl RiskFactor {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tachycardia => "High heart rate (tachycardia)",
            Self::Bradycardia => "Low heart rate (bradycardia)",
            Self::HighSystolic => "High systolic blood pressure",
            Self::HighDiastolic => "High diastolic blood pressure",
            Self::ElevatedGlucose => "Elevated blood glucose",
            Self::LowGlucose => "Low blood glucose",
            Self::InsufficientSleep => "Insufficient sleep",
            Self::ExcessiveSleep => "Excessive sleep",
            Self::Fever => "Fever detected",
            Self::LowTemperature => "Low body temperature",
            Self::LowOxygen => "Low oxygen saturation",
            Self::AdvancedAge => "Advanced age",
        }
    }
}

impl std::fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Above `high` -> first flag, else below `low` -> second flag.
fn band(
    value: f64,
    high: f64,
    above: RiskFactor,
    low: f64,
    below: RiskFactor,
) -> Option<RiskFactor> {
    if value > high {
        Some(above)
    } else if value < low {
        Some(below)
    } else {
        None
    }
}

/// Presentation logic on top of the classifier output.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskExplainer;

impl RiskExplainer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every threshold rule, in fixed order.
    #[must_use]
    pub fn risk_factors(&self, features: &FeatureMap) -> Vec<RiskFactor> {
        let heart_rate = features.vital(VitalField::HeartRate);
        let systolic = features.vital(VitalField::BpSystolic);
        let diastolic = features.vital(VitalField::BpDiastolic);
        let glucose = features.vital(VitalField::Glucose);
        let sleep = features.vital(VitalField::SleepHours);
        let temperature = features.vital(VitalField::Temperature);
        let oxygen = features.vital(VitalField::OxygenLevel);
        let age = features.vital(VitalField::Age);

        [
            band(heart_rate, 100.0, RiskFactor::Tachycardia, 60.0, RiskFactor::Bradycardia),
            (systolic > 140.0).then_some(RiskFactor::HighSystolic),
            (diastolic > 90.0).then_some(RiskFactor::HighDiastolic),
            band(glucose, 140.0, RiskFactor::ElevatedGlucose, 70.0, RiskFactor::LowGlucose),
            band(sleep, 10.0, RiskFactor::ExcessiveSleep, 6.0, RiskFactor::InsufficientSleep),
            band(temperature, 100.0, RiskFactor::Fever, 97.0, RiskFactor::LowTemperature),
            (oxygen < 95.0).then_some(RiskFactor::LowOxygen),
            (age > 65.0).then_some(RiskFactor::AdvancedAge),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Human-readable risk factors.
    #[must_use]
    pub fn identify_risk_factors(&self, features: &FeatureMap) -> Vec<String> {
        self.risk_factors(features)
            .into_iter()
            .map(|f| f.as_str().to_string())
            .collect()
    }

    /// Narrative for a risk level and its factors.
    #[must_use]
    pub fn explain(&self, risk_level: RiskLevel, risk_factors: &[String]) -> String {
        match risk_level {
            RiskLevel::High if risk_factors.len() > 2 => format!(
                "High risk detected due to multiple factors: {}. Immediate medical attention recommended.",
                risk_factors[..3].join(", ")
            ),
            RiskLevel::High => format!(
                "High risk detected. Key concerns: {}. Please consult healthcare provider.",
                risk_factors.join(", ")
            ),
            RiskLevel::Medium if !risk_factors.is_empty() => format!(
                "Moderate risk identified. Monitor: {}. Consider lifestyle adjustments.",
                risk_factors[..risk_factors.len().min(2)].join(", ")
            ),
            RiskLevel::Medium => {
                "Moderate risk level. Continue monitoring health parameters regularly.".to_string()
            }
            RiskLevel::Low | RiskLevel::Unknown => {
                "Low risk level. Health parameters appear normal. Continue healthy lifestyle practices."
                    .to_string()
            }
        }
    }
}
